//! Remote submission tracking types
//!
//! The intake service reports status strings in more than one spelling
//! (`"InProgress"`, `"in progress"`, `"partially valid"`), so the status
//! enums parse case-insensitively and ignore separators.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Batch-level status of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverallStatus {
    InProgress,
    Valid,
    Invalid,
    Partial,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "InProgress",
            Self::Valid => "Valid",
            Self::Invalid => "Invalid",
            Self::Partial => "Partial",
        }
    }

    /// Any status other than `InProgress` ends polling.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

fn squash(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>().to_ascii_lowercase()
}

impl FromStr for OverallStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match squash(raw).as_str() {
            "inprogress" => Ok(Self::InProgress),
            "valid" => Ok(Self::Valid),
            "invalid" => Ok(Self::Invalid),
            "partial" | "partiallyvalid" => Ok(Self::Partial),
            _ => Err(format!("unknown overall status: {raw}")),
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OverallStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OverallStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Per-document status inside a submission's summary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentStatus {
    /// Accepted by the intake layer, validation not finished.
    Submitted,
    Valid,
    Invalid,
    Cancelled,
    /// A status this client does not know about, kept verbatim.
    Unknown(String),
}

impl DocumentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Submitted => "Submitted",
            Self::Valid => "Valid",
            Self::Invalid => "Invalid",
            Self::Cancelled => "Cancelled",
            Self::Unknown(raw) => raw,
        }
    }

    /// Case-insensitive comparison against a configured status name.
    pub fn matches(&self, name: &str) -> bool {
        squash(self.as_str()) == squash(name)
    }
}

impl From<&str> for DocumentStatus {
    fn from(raw: &str) -> Self {
        match squash(raw).as_str() {
            "submitted" => Self::Submitted,
            "valid" => Self::Valid,
            "invalid" => Self::Invalid,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Unknown(raw.to_string()),
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DocumentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DocumentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

/// One remote-tracked batch of documents.
///
/// `members` is fixed at creation; only `overall_status` moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionBatch {
    pub submission_id: String,
    pub members: Vec<String>,
    pub overall_status: OverallStatus,
}

/// A document the service took in for asynchronous validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedDocument {
    pub uuid: String,
    pub invoice_code_number: String,
}

/// Structured error body returned by the intake service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<RemoteErrorDetail>,
}

impl RemoteErrorDetail {
    /// Top-level message followed by any nested detail messages.
    pub fn full_message(&self) -> String {
        if self.details.is_empty() {
            return self.message.clone();
        }
        let nested: Vec<String> = self
            .details
            .iter()
            .map(|d| match &d.target {
                Some(target) => format!("{target}: {}", d.message),
                None => d.message.clone(),
            })
            .collect();
        format!("{} ({})", self.message, nested.join("; "))
    }
}

/// A document the service refused synchronously during submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedDocument {
    pub invoice_code_number: String,
    pub error: RemoteErrorDetail,
}

/// Result of a successful submit call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionAck {
    pub batch: SubmissionBatch,
    pub accepted: Vec<AcceptedDocument>,
    pub rejected: Vec<RejectedDocument>,
}

/// Per-document entry of a status response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub uuid: String,
    #[serde(default)]
    pub submission_uid: Option<String>,
    /// The caller's code number, echoed back by the service.
    #[serde(default)]
    pub internal_id: Option<String>,
    /// Long-term identifier, only issued once a document is validated.
    #[serde(default)]
    pub long_id: Option<String>,
    pub status: DocumentStatus,
}

/// Response of the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionStatus {
    #[serde(default)]
    pub submission_uid: String,
    pub overall_status: OverallStatus,
    #[serde(default)]
    pub document_summary: Vec<DocumentSummary>,
    #[serde(default)]
    pub date_time_received: Option<String>,
    #[serde(default)]
    pub document_count: Option<u32>,
}
