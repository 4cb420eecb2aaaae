//! Cache-aware document fetching.
//!
//! Serves a fresh cache entry when one exists, otherwise fetches through
//! the proxy and writes the result back to the cache.

use std::time::Duration;

use onionfetch_core::{AppConfig, CacheStore, Error};

use crate::fetch::{FetchClient, FetchConfig, validate};

/// Per-call options for [`DocumentFetcher::fetch_document`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Read from and write to the cache (default: true).
    pub use_cache: bool,
    /// Maximum cache entry age in seconds; `None` uses the configured TTL.
    pub ttl_secs: Option<u64>,
    /// Request timeout; `None` uses the configured timeout.
    pub timeout: Option<Duration>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self { use_cache: true, ttl_secs: None, timeout: None }
    }
}

/// Where a document's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cache,
    Network,
}

/// A fetched document.
#[derive(Debug)]
pub struct Document {
    pub url: String,
    pub content: String,
    pub origin: Origin,
    /// Set when the content was fetched but could not be written to the cache.
    pub cache_error: Option<Error>,
}

/// Fetcher combining the proxied HTTP client with the document cache.
#[derive(Debug, Clone)]
pub struct DocumentFetcher {
    client: FetchClient,
    cache: CacheStore,
    default_ttl_secs: u64,
}

impl DocumentFetcher {
    pub fn new(client: FetchClient, cache: CacheStore, default_ttl_secs: u64) -> Self {
        Self { client, cache, default_ttl_secs }
    }

    /// Build the client and cache store described by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let client = FetchClient::new(FetchConfig::from(config))?;
        Ok(Self::new(client, config.cache_store(), config.cache_ttl_secs))
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Fetch `url`, serving it from the cache when a fresh entry exists.
    ///
    /// The URL is validated before the cache or network is touched. A failed
    /// cache write does not fail the call: the content is returned with the
    /// write error in [`Document::cache_error`].
    ///
    /// # Errors
    ///
    /// - `Error::InvalidInput` if `url` is not an http(s) URL with a host
    /// - `Error::Fetch` on any transport, proxy, timeout or status failure
    pub async fn fetch_document(&self, url: &str, options: &FetchOptions) -> Result<Document, Error> {
        validate(url).map_err(|e| Error::InvalidInput(e.to_string()))?;

        if options.use_cache {
            let ttl = options.ttl_secs.unwrap_or(self.default_ttl_secs);
            let lookup = self.cache.lookup(url, ttl);
            tracing::debug!(url, state = lookup.state(), ttl, "cache lookup");

            if let Some(content) = lookup.into_content() {
                return Ok(Document { url: url.to_string(), content, origin: Origin::Cache, cache_error: None });
            }
        }

        let response = self.client.fetch(url, options.timeout).await?;

        let cache_error = if options.use_cache { self.cache.save(url, &response.text).err() } else { None };
        if let Some(e) = &cache_error {
            tracing::warn!(url, error = %e, "fetched document could not be cached");
        }

        Ok(Document { url: url.to_string(), content: response.text, origin: Origin::Network, cache_error })
    }
}
