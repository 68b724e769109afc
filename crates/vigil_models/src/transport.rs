//! HTTP transport seam.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};
use vigil_error::{VigilError, VigilErrorKind, VigilResult};

/// Raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends request bytes and returns response bytes or a transport error.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` as JSON to `url` with extra `headers`.
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: Vec<u8>,
    ) -> VigilResult<TransportResponse>;
}

/// [`Transport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> VigilResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VigilError::new(VigilErrorKind::Config(format!("HTTP client: {}", e))))?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self, headers, body), fields(body_len = body.len()))]
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: Vec<u8>,
    ) -> VigilResult<TransportResponse> {
        let mut request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| self.map_error(e))?;
        debug!(status, len = body.len(), "Received response");
        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }
}

impl ReqwestTransport {
    fn map_error(&self, error: reqwest::Error) -> VigilError {
        if error.is_timeout() {
            VigilError::new(VigilErrorKind::Timeout(self.timeout))
        } else {
            VigilError::new(VigilErrorKind::Transport(error.to_string()))
        }
    }
}
