//! Wire-format documents produced by the document codec.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Serialization format of a document payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentFormat {
    #[default]
    Json,
    Xml,
}

impl DocumentFormat {
    /// Format name as the intake service expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Xml => "XML",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An encoded document, immutable once built.
///
/// Fields are private so that a payload can never drift from the hash that
/// was computed for it.
#[derive(Clone, PartialEq, Eq)]
pub struct Document {
    external_id: String,
    payload: Vec<u8>,
    content_hash: String,
    format: DocumentFormat,
}

impl Document {
    /// Build a document from an already computed content hash.
    pub fn new(
        external_id: impl Into<String>,
        payload: Vec<u8>,
        content_hash: impl Into<String>,
        format: DocumentFormat,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            payload,
            content_hash: content_hash.into(),
            format,
        }
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Lowercase hex SHA-256 of `payload`.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("external_id", &self.external_id)
            .field("payload_len", &self.payload.len())
            .field("content_hash", &self.content_hash)
            .field("format", &self.format)
            .finish()
    }
}
