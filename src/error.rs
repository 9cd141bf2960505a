//! Error taxonomy of the synchronization engine.

use thiserror::Error;

use crate::model::DecodeError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Network unreachable, DNS failure, timeout. Transient.
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// 5xx or an unreadable response. Transient.
    #[error("server error ({status:?}): {message}")]
    Server { status: Option<u16>, message: String },

    /// 401. The session must be re-established.
    #[error("authentication failed")]
    Authentication,

    #[error("not found: {0}")]
    NotFound(String),

    /// 4xx other than 401/404, or a request the client could not build.
    #[error("client error ({status:?}): {message}")]
    Client { status: Option<u16>, message: String },

    /// The server broke the payload contract.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("notification service has stopped")]
    ServiceStopped,
}

impl SyncError {
    /// Returns true if the polling loop should retry after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Connectivity(_) | SyncError::Server { .. })
    }

    pub fn server(message: impl Into<String>) -> Self {
        SyncError::Server {
            status: None,
            message: message.into(),
        }
    }

    /// Maps an HTTP status to the taxonomy.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => SyncError::Authentication,
            404 => SyncError::NotFound(message),
            400 | 402..=499 => SyncError::Client {
                status: Some(status),
                message,
            },
            500..=598 => SyncError::Server {
                status: Some(status),
                message,
            },
            // Network connect timeout.
            599 => SyncError::Connectivity(message),
            _ => SyncError::Server {
                status: Some(status),
                message,
            },
        }
    }
}

impl From<DecodeError> for SyncError {
    fn from(error: DecodeError) -> Self {
        SyncError::ProtocolViolation(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(SyncError::from_status(401, "x"), SyncError::Authentication);
        assert!(matches!(SyncError::from_status(404, "x"), SyncError::NotFound(_)));
        assert!(matches!(
            SyncError::from_status(422, "x"),
            SyncError::Client {
                status: Some(422),
                ..
            }
        ));
        assert!(matches!(
            SyncError::from_status(503, "x"),
            SyncError::Server {
                status: Some(503),
                ..
            }
        ));
        assert!(matches!(
            SyncError::from_status(599, "x"),
            SyncError::Connectivity(_)
        ));
    }

    #[test]
    fn test_only_transient_errors_retry() {
        assert!(SyncError::Connectivity("down".into()).is_retryable());
        assert!(SyncError::server("boom").is_retryable());
        assert!(!SyncError::Authentication.is_retryable());
        assert!(!SyncError::ProtocolViolation("bad".into()).is_retryable());
        assert!(!SyncError::from_status(400, "bad").is_retryable());
    }

    #[test]
    fn test_decode_error_converts_to_protocol_violation() {
        let error: SyncError = DecodeError::CoreField("id").into();
        assert!(matches!(error, SyncError::ProtocolViolation(_)));
    }
}
