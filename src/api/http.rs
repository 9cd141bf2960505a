//! reqwest-backed [`Transport`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use super::transport::{ApiRequest, HttpMethod, Transport};
use crate::error::SyncError;

/// HTTP transport talking to the GeoConfess REST API.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a new transport.
    ///
    /// # Arguments
    /// * `base_url` - API root (e.g., "https://geoconfess.herokuapp.com/api/v1")
    /// * `timeout_secs` - Request timeout in seconds
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SyncError::Client {
                status: None,
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn map_reqwest_error(error: reqwest::Error) -> SyncError {
    if error.is_timeout() || error.is_connect() {
        SyncError::Connectivity(error.to_string())
    } else if error.is_builder() {
        SyncError::Client {
            status: None,
            message: error.to_string(),
        }
    } else if let Some(status) = error.status() {
        SyncError::from_status(status.as_u16(), error.to_string())
    } else {
        SyncError::server(error.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Value, SyncError> {
        let url = self.url_for(&request.path);
        debug!("{} {}", request.method, url);

        let builder = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Put => self.client.put(&url),
        };
        let builder = builder.bearer_auth(&request.access_token);
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            return Err(SyncError::from_status(
                status.as_u16(),
                format!("{} {} failed with status {}", request.method, request.path, status),
            ));
        }
        if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| SyncError::server(format!("Failed to parse response body: {}", e)))
    }
}
