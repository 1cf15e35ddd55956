//! Error types used throughout the submission pipeline

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for TaxBridge
///
/// Variants follow the pipeline's failure taxonomy: local validation never
/// reaches the network, transport and remote rejections are distinguished by
/// whether the remote service answered at all, and authentication failures
/// abort the whole batch.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum TaxBridgeError {
    #[error("Local validation failed: {0}")]
    LocalValidation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote rejection (HTTP {status}): {code}: {message}")]
    RemoteRejection { status: u16, code: String, message: String },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Polling for submission {submission_id} timed out after {attempts} attempts")]
    PollingTimeout { submission_id: String, attempts: u32 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TaxBridgeError {
    /// Whether a caller may reasonably retry the failed operation.
    ///
    /// Transport failures are always retryable. Remote rejections are only
    /// retryable when the service signalled overload (429) or a server fault
    /// (5xx).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::RemoteRejection { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Stable label suitable for structured logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::LocalValidation(_) => "local_validation",
            Self::Transport(_) => "transport",
            Self::RemoteRejection { .. } => "remote_rejection",
            Self::Auth(_) => "auth",
            Self::PollingTimeout { .. } => "polling_timeout",
            Self::Config(_) => "config",
            Self::Cancelled => "cancelled",
            Self::Internal(_) => "internal",
        }
    }

    /// Remote error code and message, when the service supplied them.
    pub fn remote_detail(&self) -> Option<(&str, &str)> {
        match self {
            Self::RemoteRejection { code, message, .. } => Some((code, message)),
            _ => None,
        }
    }
}

/// Result type alias for TaxBridge operations
pub type Result<T> = std::result::Result<T, TaxBridgeError>;
