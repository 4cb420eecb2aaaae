//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (ONIONFETCH_*)
//! 2. TOML config file (if ONIONFETCH_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The loaded value is read once at startup and handed to the fetcher and
//! cache store explicitly; nothing here is global.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheStore, Flat, HostScoped};

mod validation;

pub use validation::ConfigError;

/// Which directory layout the cache uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    /// `{cache_root}/{host}/{key}.*`
    #[default]
    Host,
    /// `{cache_root}/{key}.*`
    Flat,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (ONIONFETCH_*)
/// 2. TOML config file (if ONIONFETCH_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// SOCKS5 proxy every request goes through.
    ///
    /// Set via ONIONFETCH_PROXY_URL environment variable. Use `socks5h://`
    /// so hostnames are resolved by the proxy, not locally.
    #[serde(default = "default_proxy_url")]
    pub proxy_url: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via ONIONFETCH_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in seconds.
    ///
    /// Set via ONIONFETCH_TIMEOUT_SECS environment variable.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum age in seconds of a cache entry that may still be served.
    ///
    /// Set via ONIONFETCH_CACHE_TTL_SECS environment variable.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Directory holding cached documents.
    ///
    /// Set via ONIONFETCH_CACHE_ROOT environment variable.
    #[serde(default = "default_cache_root")]
    pub cache_root: PathBuf,

    /// Cache directory layout: `host` or `flat`.
    ///
    /// Set via ONIONFETCH_CACHE_LAYOUT environment variable.
    #[serde(default)]
    pub cache_layout: LayoutKind,
}

fn default_proxy_url() -> String {
    "socks5h://127.0.0.1:9050".into()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64; rv:115.0) Gecko/20100101 Firefox/115.0".into()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_cache_ttl_secs() -> u64 {
    600 // 10 minutes
}

fn default_cache_root() -> PathBuf {
    PathBuf::from(".cache")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            proxy_url: default_proxy_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_root: default_cache_root(),
            cache_layout: LayoutKind::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Cache store rooted at `cache_root` with the configured layout.
    pub fn cache_store(&self) -> CacheStore {
        match self.cache_layout {
            LayoutKind::Host => CacheStore::new(&self.cache_root, HostScoped),
            LayoutKind::Flat => CacheStore::new(&self.cache_root, Flat),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `ONIONFETCH_`
    /// 2. TOML file from `ONIONFETCH_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("ONIONFETCH_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("ONIONFETCH_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.proxy_url, "socks5h://127.0.0.1:9050");
        assert!(config.user_agent.contains("Firefox/115.0"));
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.cache_ttl_secs, 600);
        assert_eq!(config.cache_root, PathBuf::from(".cache"));
        assert_eq!(config.cache_layout, LayoutKind::Host);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_cache_store_uses_layout() {
        let url = "http://abc.onion/x";

        let host = AppConfig { cache_root: "/c".into(), ..Default::default() }.cache_store();
        assert_eq!(host.paths_for(url).unwrap().dir, PathBuf::from("/c/abc"));

        let flat = AppConfig { cache_root: "/c".into(), cache_layout: LayoutKind::Flat, ..Default::default() }
            .cache_store();
        assert_eq!(flat.paths_for(url).unwrap().dir, PathBuf::from("/c"));
    }

    #[test]
    fn test_load_defaults() {
        Jail::expect_with(|_jail| {
            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.timeout_secs, 60);
            assert_eq!(config.cache_layout, LayoutKind::Host);
            Ok(())
        });
    }

    #[test]
    fn test_load_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "onionfetch.toml",
                r#"
                    proxy_url = "socks5h://10.0.0.1:9150"
                    timeout_secs = 30
                    cache_layout = "flat"
                "#,
            )?;
            jail.set_env("ONIONFETCH_CONFIG_FILE", "onionfetch.toml");
            jail.set_env("ONIONFETCH_TIMEOUT_SECS", "15");
            jail.set_env("ONIONFETCH_CACHE_ROOT", "/var/cache/onionfetch");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.proxy_url, "socks5h://10.0.0.1:9150");
            assert_eq!(config.timeout_secs, 15);
            assert_eq!(config.cache_layout, LayoutKind::Flat);
            assert_eq!(config.cache_root, PathBuf::from("/var/cache/onionfetch"));
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        Jail::expect_with(|jail| {
            jail.set_env("ONIONFETCH_TIMEOUT_SECS", "0");
            let result = AppConfig::load();
            assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_secs"));
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_unknown_layout() {
        Jail::expect_with(|jail| {
            jail.set_env("ONIONFETCH_CACHE_LAYOUT", "sharded");
            assert!(matches!(AppConfig::load(), Err(ConfigError::LoadFailed(_))));
            Ok(())
        });
    }
}
