use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Status and body of a completed upstream HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failures below the HTTP layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("{0}")]
    Connect(String),
}

/// The single network seam of the retry client.
///
/// Implementations issue one GET and must not retry on their own.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url, timeout: Duration) -> Result<TransportResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn get(&self, url: &Url, timeout: Duration) -> Result<TransportResponse, TransportError> {
        (**self).get(url, timeout).await
    }
}

/// `Transport` backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pagecheck/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()
            .map_err(|e| TransportError::Connect(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &Url, timeout: Duration) -> Result<TransportResponse, TransportError> {
        tracing::debug!("GET {} (timeout {}ms)", redact_key(url), timeout.as_millis());

        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_reqwest_error)?;

        tracing::debug!("Upstream responded with HTTP {} ({} bytes)", status, body.len());

        Ok(TransportResponse { status, body })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Connect(err.to_string())
    }
}

/// Render a URL for logs with any `key` query parameter masked
pub fn redact_key(url: &Url) -> String {
    if !url.query_pairs().any(|(name, _)| name == "key") {
        return url.to_string();
    }

    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(name, value)| {
            let value = if name == "key" {
                "[REDACTED]".to_string()
            } else {
                value.into_owned()
            };
            (name.into_owned(), value)
        })
        .collect();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}
