//! HTTP fetch through a SOCKS5 proxy.
//!
//! ### Proxy
//! - Every request goes through `Proxy::all(proxy_url)`
//! - `socks5h://` hands hostname resolution to the proxy, so `.onion`
//!   hosts resolve and no lookup leaks to the local resolver
//!
//! ### Connections
//! - Idle pooling is disabled; each fetch opens and closes its own connection
//! - One attempt per call, bounded by the request timeout
//!
//! ### Decoding
//! - Declared `Content-Type` charset, else `<meta>` charset, else UTF-8
//!   when the body is valid UTF-8, else a guess from the body bytes

pub mod charset;
pub mod url;

use reqwest::Url;
use reqwest::{Client, Proxy, StatusCode, header};
use std::time::{Duration, Instant};

pub use url::{UrlError, validate};

use onionfetch_core::{AppConfig, Error};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// SOCKS proxy URL (default: "socks5h://127.0.0.1:9050")
    pub proxy_url: String,

    /// User agent string sent with every request
    pub user_agent: String,

    /// Request timeout (default: 60s)
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self { proxy_url: config.proxy_url.clone(), user_agent: config.user_agent.clone(), timeout: config.timeout() }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Name of the encoding the body was decoded with
    pub encoding: &'static str,
    /// Decoded response body
    pub text: String,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

/// HTTP client bound to one proxy.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Client` if the proxy URL is rejected or the HTTP
    /// client cannot be built.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let proxy = Proxy::all(&config.proxy_url)
            .map_err(|e| Error::Client(format!("invalid proxy URL {}: {}", config.proxy_url, e)))?;

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .proxy(proxy)
            .pool_max_idle_per_host(0)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Client(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Fetch a URL through the proxy and decode the body as text.
    ///
    /// `timeout` overrides the configured timeout for this request only.
    /// Non-2xx statuses are errors; nothing partial is returned.
    pub async fn fetch(&self, url_str: &str, timeout: Option<Duration>) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let url = validate(url_str).map_err(|e| Error::InvalidInput(e.to_string()))?;

        let timeout = timeout.unwrap_or(self.config.timeout);
        let request = self.http.get(url.clone()).header(header::ACCEPT, ACCEPT_HTML).timeout(timeout);

        tracing::debug!("GET {} (timeout {:?})", url, timeout);
        let response = request.send().await.map_err(|e| Error::fetch(url_str, e))?;
        let response = response.error_for_status().map_err(|e| Error::fetch(url_str, e))?;

        let status = response.status();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response.bytes().await.map_err(|e| Error::fetch(url_str, e))?;
        let (text, encoding) = charset::decode_body(content_type.as_deref(), &bytes);

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} -> {} in {}ms ({} bytes, {})",
            url,
            final_url,
            fetch_ms,
            bytes.len(),
            encoding
        );

        Ok(FetchResponse { url, final_url, status, content_type, encoding, text, fetch_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubProxy, refused_proxy_url};

    fn client_for(proxy_url: String) -> FetchClient {
        FetchClient::new(FetchConfig { proxy_url, timeout: Duration::from_secs(5), ..Default::default() }).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.proxy_url, "socks5h://127.0.0.1:9050");
        assert!(config.user_agent.starts_with("Mozilla/5.0"));
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_client_rejects_bad_proxy() {
        let config = FetchConfig { proxy_url: "not a proxy".into(), ..Default::default() };
        assert!(matches!(FetchClient::new(config), Err(Error::Client(_))));
    }

    #[tokio::test]
    async fn test_fetch_through_proxy() {
        let proxy = StubProxy::ok("<html>ok</html>").await;
        let response = client_for(proxy.proxy_url()).fetch("http://example.onion/page", None).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.text, "<html>ok</html>");
        assert_eq!(response.encoding, "UTF-8");
        assert_eq!(response.content_type.as_deref(), Some("text/html; charset=utf-8"));
        assert_eq!(response.final_url.as_str(), "http://example.onion/page");
    }

    #[tokio::test]
    async fn test_fetch_resolves_host_through_proxy() {
        let proxy = StubProxy::ok("<html>ok</html>").await;
        client_for(proxy.proxy_url()).fetch("http://example.onion/page", None).await.unwrap();

        assert_eq!(proxy.targets(), vec!["example.onion:80".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_sends_user_agent() {
        let proxy = StubProxy::ok("<html>ok</html>").await;
        client_for(proxy.proxy_url()).fetch("http://example.onion/page", None).await.unwrap();

        let requests = proxy.requests();
        assert_eq!(requests.len(), 1);
        let request = requests[0].to_ascii_lowercase();
        assert!(request.starts_with("get /page http/1.1"));
        assert!(request.contains("user-agent: mozilla/5.0 (x11; linux x86_64; rv:115.0)"));
    }

    #[tokio::test]
    async fn test_fetch_decodes_meta_charset() {
        let body = b"<html><head><meta charset=\"windows-1252\"></head><body>caf\xe9</body></html>".to_vec();
        let proxy = StubProxy::start(StubProxy::response("200 OK", "text/html", &body)).await;
        let response = client_for(proxy.proxy_url()).fetch("http://example.onion/", None).await.unwrap();

        assert!(response.text.contains("café"));
        assert_eq!(response.encoding, "windows-1252");
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let proxy = StubProxy::start(StubProxy::response("404 Not Found", "text/html", b"missing")).await;
        let result = client_for(proxy.proxy_url()).fetch("http://example.onion/gone", None).await;

        let err = result.unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
        assert!(err.to_string().contains("http://example.onion/gone"));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let proxy_url = refused_proxy_url().await;
        let result = client_for(proxy_url).fetch("http://example.onion/page", None).await;

        let err = result.unwrap_err();
        assert!(matches!(err, Error::Fetch { ref url, .. } if url == "http://example.onion/page"));
        assert!(err.to_string().contains("http://example.onion/page"));
    }

    #[tokio::test]
    async fn test_fetch_timeout_override() {
        let proxy = StubProxy::silent().await;
        let started = Instant::now();
        let result = client_for(proxy.proxy_url())
            .fetch("http://example.onion/slow", Some(Duration::from_millis(300)))
            .await;

        assert!(matches!(result, Err(Error::Fetch { .. })));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_fetch_uses_configured_timeout() {
        let proxy = StubProxy::silent().await;
        let client = FetchClient::new(FetchConfig {
            proxy_url: proxy.proxy_url(),
            timeout: Duration::from_millis(300),
            ..Default::default()
        })
        .unwrap();

        let started = Instant::now();
        let result = client.fetch("http://example.onion/slow", None).await;

        assert!(matches!(result, Err(Error::Fetch { .. })));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_fetch_invalid_url_skips_network() {
        let proxy = StubProxy::ok("<html>ok</html>").await;
        let result = client_for(proxy.proxy_url()).fetch("ftp://x", None).await;

        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(proxy.connections(), 0);
    }
}
