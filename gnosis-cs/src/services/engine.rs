//! Shared plumbing for the external analytics engine HTTP API
//!
//! The engine serves encoding (`/encoder/*`) and WebRTC signaling
//! (`/detector/stream`, `/recognizer/stream`). Requests are single-shot:
//! no retries and no overall request timeout, only a connect timeout.

use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("gnosis-cs/", env!("CARGO_PKG_VERSION"));

/// Analytics engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Connection refused, reset, DNS failure...
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status from the engine
    #[error("Engine error {0}: {1}")]
    Api(u16, String),

    /// Response body did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Base URL plus a pooled HTTP client
#[derive(Debug, Clone)]
pub struct EngineEndpoint {
    http_client: reqwest::Client,
    base_url: String,
}

impl EngineEndpoint {
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self, EngineError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| EngineError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http_client
    }
}

/// Send a prepared request and decode a JSON success body
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, EngineError> {
    let response = request
        .send()
        .await
        .map_err(|e| EngineError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(EngineError::Api(status.as_u16(), error_text));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| EngineError::Parse(e.to_string()))
}
