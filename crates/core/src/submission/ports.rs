//! Submission port interfaces

use async_trait::async_trait;
use taxbridge_domain::{CustomerData, Document, InvoiceItem, Result, SubmissionAck, SubmissionStatus};

/// Turns an invoice item into its wire document.
///
/// Implementations must be pure: the same inputs always produce the same
/// payload and content hash.
pub trait DocumentCodec: Send + Sync {
    /// Encode `item` for the customer it references.
    ///
    /// Fails with `TaxBridgeError::LocalValidation` when a mandatory field
    /// is missing from either input.
    fn encode(&self, item: &InvoiceItem, customer: &CustomerData) -> Result<Document>;
}

/// Reference-data lookup for customers
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// `Ok(None)` when the customer does not exist.
    async fn customer_data(&self, customer_id: &str) -> Result<Option<CustomerData>>;
}

/// Authenticated access to the remote intake service
#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    /// Submit encoded documents in a single call.
    async fn submit_documents(&self, documents: &[Document]) -> Result<SubmissionAck>;

    /// Fetch the current status of a submission.
    async fn submission_status(&self, submission_id: &str) -> Result<SubmissionStatus>;
}
