//! Unified error types for onionfetch.
//!
//! Cache read problems (missing, stale, corrupt entries) are deliberately
//! absent here: they surface as [`crate::cache::CacheLookup`] variants and
//! degrade to a cache miss.

use std::path::PathBuf;

/// Boxed cause carried by [`Error::Fetch`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Unified error types for onionfetch.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed URL or disallowed scheme. Raised before any I/O.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Transport, proxy, timeout, or non-success HTTP status.
    #[error("FETCH_ERROR: failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: BoxError,
    },

    /// HTTP client could not be built (bad proxy URL, TLS backend failure).
    #[error("CLIENT_ERROR: {0}")]
    Client(String),

    /// Cache write or delete failed.
    #[error("CACHE_ERROR: {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cache metadata could not be serialized.
    #[error("CACHE_ERROR: metadata encoding failed: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a transport-level failure for `url`.
    pub fn fetch(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Fetch { url: url.into(), source: source.into() }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }
}
