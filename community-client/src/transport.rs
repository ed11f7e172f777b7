use aiden_core::CoreError;
use async_trait::async_trait;
use reqwest::Client;
use std::fmt::Debug;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, "OK", body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failures where no HTTP response was received.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("{0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// The HTTP seam the endpoint functions issue their GET requests through.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    async fn get(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<TransportResponse, TransportError>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CoreError> {
        let parsed = Url::parse(base_url).map_err(|e| CoreError::InvalidInput {
            message: format!("invalid API base URL '{}': {}", base_url, e),
        })?;

        let client = Client::builder()
            .user_agent(concat!("aiden/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Internal {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn endpoint_url(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Url, TransportError> {
        let raw = format!("{}{}", self.base_url, path);
        let pairs = query.iter().map(|(k, v)| (k.as_str(), v.as_str()));
        Url::parse_with_params(&raw, pairs)
            .map_err(|e| TransportError::Network(format!("invalid URL {}: {}", raw, e)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<TransportResponse, TransportError> {
        let url = self.endpoint_url(path, query)?;
        debug!("GET {}", url);

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            error!("Network error for GET {}: {}", url, e);
            if e.is_timeout() {
                TransportError::Timeout(self.timeout)
            } else {
                TransportError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(self.timeout)
            } else {
                TransportError::Network(e.to_string())
            }
        })?;

        Ok(TransportResponse {
            status: status.as_u16(),
            status_text,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_keeps_base_path() {
        let transport =
            HttpTransport::new("http://localhost:3000/api/", Duration::from_secs(5)).unwrap();
        let url = transport
            .endpoint_url(
                "/community/metrics",
                &[
                    ("platform".to_string(), "all".to_string()),
                    ("timeRange".to_string(), "24h".to_string()),
                ],
            )
            .unwrap();

        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/community/metrics?platform=all&timeRange=24h"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let result = HttpTransport::new("not a url", Duration::from_secs(5));
        assert!(matches!(result, Err(CoreError::InvalidInput { .. })));
    }

    #[test]
    fn test_response_success_range() {
        assert!(TransportResponse::ok("{}").is_success());
        assert!(!TransportResponse::new(404, "Not Found", "").is_success());
    }
}
