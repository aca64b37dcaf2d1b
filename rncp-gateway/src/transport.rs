//! HTTP transport to the campus API.
//!
//! The fetcher talks to a [`Transport`] so that pagination and normalization
//! can be tested without a network.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::GatewayError;

/// One authenticated GET against the upstream API.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `{base}{path}` with the given query pairs and bearer token.
    async fn get(&self, path: &str, query: &[(String, String)], token: &str) -> Result<Value, GatewayError>;
}

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// API base URL, without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.intra.42.fr/v2".to_string(),
            timeout: Duration::from_millis(30_000),
        }
    }
}

/// `reqwest` implementation of [`Transport`].
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Result<Self, GatewayError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Seconds from a `Retry-After` header, when it is a plain integer.
fn retry_after(headers: &header::HeaderMap) -> Option<u64> {
    headers
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, query: &[(String, String)], token: &str) -> Result<Value, GatewayError> {
        let url = self.url(path);
        debug!(url = %url, "GET");

        let response = self
            .client
            .get(&url)
            .query(query)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = if status == StatusCode::TOO_MANY_REQUESTS {
                retry_after(response.headers())
            } else {
                None
            };
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), path, "Upstream returned error status");
            return Err(GatewayError::from_status(status.as_u16(), body, retry_after_secs));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}
