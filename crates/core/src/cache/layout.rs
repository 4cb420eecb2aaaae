//! Path resolution strategies for cache entries.
//!
//! A layout decides which directory an entry lives in. File names inside
//! that directory are always `{key}.html` and `{key}.meta.json`.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::Error;

/// Directory name used when a host sanitizes to nothing.
pub const UNKNOWN_HOST: &str = "unknown";

/// Strategy mapping a URL to the directory holding its cache entry.
///
/// Implementations must be deterministic: the same URL always resolves to
/// the same directory.
pub trait CacheLayout: Send + Sync + fmt::Debug {
    /// Directory for `url`'s entry under `root`.
    fn entry_dir(&self, root: &Path, url: &str) -> Result<PathBuf, Error>;
}

/// One subdirectory per host: `{root}/{sanitize_host(host)}/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostScoped;

/// All entries directly under `{root}/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flat;

impl CacheLayout for HostScoped {
    fn entry_dir(&self, root: &Path, url: &str) -> Result<PathBuf, Error> {
        let host = host_of(url).ok_or_else(|| Error::InvalidInput(format!("URL has no host: {url}")))?;
        Ok(root.join(sanitize_host(&host)))
    }
}

impl CacheLayout for Flat {
    fn entry_dir(&self, root: &Path, _url: &str) -> Result<PathBuf, Error> {
        Ok(root.to_path_buf())
    }
}

/// Hostname of `url` as the `url` crate reports it (lowercased for http/https).
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(str::to_owned)
}

/// Turn a hostname into a filesystem-safe directory name.
///
/// 1. Strip one trailing `.onion` (`abc.onion` -> `abc`)
/// 2. Replace every character outside `[A-Za-z0-9._-]` with `_`
/// 3. Fall back to [`UNKNOWN_HOST`] if nothing is left
pub fn sanitize_host(host: &str) -> String {
    let base = host.strip_suffix(".onion").unwrap_or(host);
    let safe: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();

    if safe.is_empty() { UNKNOWN_HOST.to_string() } else { safe }
}
