//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;
use url::Url;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `proxy_url` is not a `socks5h://` or `socks5://` URL with a host and port
    /// - `timeout_secs` is 0 or exceeds 10 minutes
    /// - `user_agent` is empty
    /// - `cache_root` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        let proxy = Url::parse(&self.proxy_url)
            .map_err(|e| ConfigError::Invalid { field: "proxy_url".into(), reason: e.to_string() })?;

        match proxy.scheme() {
            "socks5h" => {}
            "socks5" => {
                tracing::warn!(
                    proxy_url = %self.proxy_url,
                    "socks5:// resolves hostnames locally; use socks5h:// to resolve through the proxy"
                );
            }
            scheme => {
                return Err(ConfigError::Invalid {
                    field: "proxy_url".into(),
                    reason: format!("unsupported scheme {scheme}, expected socks5h"),
                });
            }
        }

        if proxy.host_str().is_none() || proxy.port().is_none() {
            return Err(ConfigError::Invalid { field: "proxy_url".into(), reason: "must include host and port".into() });
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid { field: "timeout_secs".into(), reason: "must be at least 1 second".into() });
        }
        if self.timeout_secs > 600 {
            return Err(ConfigError::Invalid {
                field: "timeout_secs".into(),
                reason: "must not exceed 10 minutes (600s)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.cache_root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid { field: "cache_root".into(), reason: "must not be empty".into() });
        }

        Ok(())
    }
}
