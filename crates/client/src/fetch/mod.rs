//! Network side of the cache layer.
//!
//! ### Transport contract
//! - `NetworkClient::fetch` fails only when no response was produced
//!   (DNS, connect, timeout, body read, size limit).
//! - Any HTTP status, including 4xx/5xx, is a successful fetch.
//!
//! ### Forwarding
//! - Method, headers and body are forwarded unchanged, minus hop-by-hop
//!   headers and `host`.
//! - Redirects are relayed to the caller, not followed (configurable).
//! - Max body bytes: 5MB (configurable)

pub mod message;
pub mod ssrf;
pub mod url;

use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use message::{ProxyRequest, ProxyResponse, ResponseSource, is_hop_by_hop};
pub use ssrf::{SsrfError, validate_target};
pub use url::{UrlError, resolve, same_origin};

use waypost_core::{AppConfig, Error};

/// Capability to perform a network fetch.
#[async_trait::async_trait]
pub trait NetworkClient: Send + Sync {
    /// Fetch `request` from the network.
    ///
    /// Returns `Err` only on transport-level failure.
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string used when the caller sends none (default: "waypost/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow; 0 relays them (default: 0)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "waypost/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 0,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed [`NetworkClient`].
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let redirect = match config.max_redirects {
            0 => reqwest::redirect::Policy::none(),
            n => reqwest::redirect::Policy::limited(n),
        };

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(redirect)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::InvalidInput(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn too_large(&self, len: usize) -> Error {
        Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes))
    }
}

#[async_trait::async_trait]
impl NetworkClient for FetchClient {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse, Error> {
        let start = Instant::now();

        let mut headers = request.headers.clone();
        headers.remove(header::HOST);
        let hop_by_hop: Vec<_> = headers.keys().filter(|name| is_hop_by_hop(name)).cloned().collect();
        for name in hop_by_hop {
            headers.remove(name);
        }

        let mut builder = self.http.request(request.method.clone(), request.url.clone()).headers(headers);
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::NetworkUnavailable(format!("timeout fetching {}: {}", request.url, e))
            } else {
                Error::NetworkUnavailable(format!("network error: {}", e))
            }
        })?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(len as usize));
        }

        let status = response.status();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::NetworkUnavailable(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(self.too_large(bytes.len()));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(ProxyResponse::new(status, headers, bytes, ResponseSource::Network))
    }
}
