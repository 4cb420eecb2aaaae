//! URL validation ahead of any cache or network access.
//!
//! Unlike a canonicalizer this never rewrites the input: the exact string is
//! what gets hashed into the cache key.

/// Error type for URL validation failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("URL must start with http:// or https://: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Check that `input` is an absolute http(s) URL with a host.
///
/// The scheme check is a literal, case-sensitive prefix match on
/// `http://` / `https://`, done before parsing.
pub fn validate(input: &str) -> Result<url::Url, UrlError> {
    if input.is_empty() {
        return Err(UrlError::Empty);
    }

    if !input.starts_with("http://") && !input.starts_with("https://") {
        return Err(UrlError::UnsupportedScheme(input.to_string()));
    }

    let parsed = url::Url::parse(input).map_err(|e| UrlError::InvalidUrl(format!("{input}: {e}")))?;

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(UrlError::InvalidUrl(format!("{input}: missing host")));
    }

    Ok(parsed)
}
