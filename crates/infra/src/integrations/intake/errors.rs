//! Intake-service error types and classification
//!
//! Classifies failures by HTTP status and transport cause and converts them
//! into the domain error at the gateway boundary. Remote rejections keep the service's code
//! and message verbatim.

use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use taxbridge_domain::{RemoteErrorDetail, TaxBridgeError};

/// Intake error category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeErrorCategory {
    /// Service unreachable
    NetworkOffline,

    /// Request timed out
    NetworkTimeout,

    /// 5xx responses
    ServerUnavailable,

    /// 401, 403
    Authentication,

    /// 429
    RateLimited,

    /// Other 4xx
    Validation,

    /// Unclassified, including unreadable success bodies
    Unknown,
}

impl IntakeErrorCategory {
    /// Classify an HTTP status code
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            401 | 403 => Self::Authentication,
            429 => Self::RateLimited,
            400..=499 => Self::Validation,
            500..=599 => Self::ServerUnavailable,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for IntakeErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkOffline => write!(f, "Network Offline"),
            Self::NetworkTimeout => write!(f, "Network Timeout"),
            Self::ServerUnavailable => write!(f, "Server Unavailable"),
            Self::Authentication => write!(f, "Authentication Failed"),
            Self::RateLimited => write!(f, "Rate Limited"),
            Self::Validation => write!(f, "Validation Error"),
            Self::Unknown => write!(f, "Unknown Error"),
        }
    }
}

/// Intake error with HTTP status and parsed remote body
#[derive(Debug, Clone)]
pub struct IntakeError {
    category: IntakeErrorCategory,
    status: Option<u16>,
    remote: Option<RemoteErrorDetail>,
    message: String,
}

/// Either `{"error": {...}}` or a flat `{"code": ..., "message": ...}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorEnvelope {
    Wrapped { error: RemoteErrorDetail },
    Flat(RemoteErrorDetail),
}

impl IntakeError {
    /// Build from a non-2xx response body.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let remote = parse_remote_error(body);
        let message = match &remote {
            Some(detail) => detail.full_message(),
            None if body.trim().is_empty() => {
                status.canonical_reason().unwrap_or("Unknown status").to_string()
            }
            None => body.chars().take(500).collect(),
        };

        Self {
            category: IntakeErrorCategory::from_status(status),
            status: Some(status.as_u16()),
            remote,
            message,
        }
    }

    /// A 2xx whose body is not the expected JSON.
    pub fn malformed_success(status: StatusCode, cause: impl fmt::Display) -> Self {
        Self {
            category: IntakeErrorCategory::Unknown,
            status: Some(status.as_u16()),
            remote: None,
            message: format!("unexpected response body: {cause}"),
        }
    }

    /// Convert to domain error type
    pub fn into_domain_error(self) -> TaxBridgeError {
        match (self.category, self.status) {
            (IntakeErrorCategory::Authentication, _) => TaxBridgeError::Auth(self.to_string()),
            (IntakeErrorCategory::NetworkOffline | IntakeErrorCategory::NetworkTimeout, _) => {
                TaxBridgeError::Transport(self.message)
            }
            (IntakeErrorCategory::Unknown, Some(status)) if (200..300).contains(&status) => {
                TaxBridgeError::Internal(self.message)
            }
            (_, Some(status)) => {
                let code = self
                    .remote
                    .as_ref()
                    .map(|r| r.code.clone())
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| self.category.to_string());
                TaxBridgeError::RemoteRejection { status, code, message: self.message }
            }
            (_, None) => TaxBridgeError::Internal(self.message),
        }
    }
}

impl fmt::Display for IntakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.category)?;
        if let Some(status) = self.status {
            write!(f, " (HTTP {status})")?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for IntakeError {}

impl From<reqwest::Error> for IntakeError {
    fn from(err: reqwest::Error) -> Self {
        let category = if err.is_timeout() {
            IntakeErrorCategory::NetworkTimeout
        } else if err.is_connect() {
            IntakeErrorCategory::NetworkOffline
        } else if let Some(status) = err.status() {
            IntakeErrorCategory::from_status(status)
        } else {
            IntakeErrorCategory::Unknown
        };

        Self {
            category,
            status: err.status().map(|s| s.as_u16()),
            remote: None,
            message: err.to_string(),
        }
    }
}

impl From<IntakeError> for TaxBridgeError {
    fn from(err: IntakeError) -> Self {
        err.into_domain_error()
    }
}

fn parse_remote_error(body: &str) -> Option<RemoteErrorDetail> {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok()?;
    let detail = match envelope {
        ErrorEnvelope::Wrapped { error } => error,
        ErrorEnvelope::Flat(detail) => detail,
    };
    (!detail.code.is_empty() || !detail.message.is_empty()).then_some(detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(
            IntakeErrorCategory::from_status(StatusCode::UNAUTHORIZED),
            IntakeErrorCategory::Authentication
        );
        assert_eq!(
            IntakeErrorCategory::from_status(StatusCode::UNPROCESSABLE_ENTITY),
            IntakeErrorCategory::Validation
        );
        assert_eq!(
            IntakeErrorCategory::from_status(StatusCode::BAD_GATEWAY),
            IntakeErrorCategory::ServerUnavailable
        );
    }

    #[test]
    fn parses_wrapped_error_body() {
        let body = r#"{"error":{"code":"DS302","message":"Duplicate submission","details":[{"code":"X","message":"seen before","target":"INV-1"}]}}"#;
        let err = IntakeError::from_response(StatusCode::UNPROCESSABLE_ENTITY, body);

        assert_eq!(err.remote.as_ref().map(|r| r.code.as_str()), Some("DS302"));
        match err.into_domain_error() {
            TaxBridgeError::RemoteRejection { status, code, message } => {
                assert_eq!(status, 422);
                assert_eq!(code, "DS302");
                assert_eq!(message, "Duplicate submission (INV-1: seen before)");
            }
            other => panic!("expected remote rejection, got {other:?}"),
        }
    }

    #[test]
    fn parses_flat_error_body() {
        let body = r#"{"code":"BadArgument","message":"documents is required"}"#;
        let err = IntakeError::from_response(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.message, "documents is required");
    }

    #[test]
    fn non_json_body_kept_as_message() {
        let err = IntakeError::from_response(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(err.remote.is_none());
        let domain = err.into_domain_error();
        assert!(domain.is_retryable());
        assert!(matches!(domain, TaxBridgeError::RemoteRejection { status: 502, .. }));
    }

    #[test]
    fn unauthorized_becomes_auth_error() {
        let err = IntakeError::from_response(StatusCode::UNAUTHORIZED, "");
        assert!(matches!(err.into_domain_error(), TaxBridgeError::Auth(_)));
    }

    #[test]
    fn malformed_success_is_internal() {
        let err = IntakeError::malformed_success(StatusCode::OK, "expected value at line 1");
        assert!(matches!(err.into_domain_error(), TaxBridgeError::Internal(_)));
    }
}
