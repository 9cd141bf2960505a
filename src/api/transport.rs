//! Abstract request/response seam to the REST server.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to the server API. `path` is relative to the API root, e.g. `/notifications`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
    pub access_token: String,
}

impl ApiRequest {
    pub fn new(
        method: HttpMethod,
        path: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            access_token: access_token.into(),
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Executes API requests.
///
/// Implementations return the decoded JSON body on success (`Value::Null` for an
/// empty body) and map every failure into the [`SyncError`] taxonomy.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<Value, SyncError>;
}
