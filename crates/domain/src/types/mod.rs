//! Domain types for the submission pipeline

pub mod document;
pub mod invoice;
pub mod outcome;
pub mod submission;

pub use document::{Document, DocumentFormat};
pub use invoice::{CustomerData, InvoiceItem, InvoiceLine};
pub use outcome::{BatchReport, DocumentOutcome, OutcomeEvidence, OutcomeStage};
pub use submission::{
    AcceptedDocument, DocumentStatus, DocumentSummary, OverallStatus, RejectedDocument,
    RemoteErrorDetail, SubmissionAck, SubmissionBatch, SubmissionStatus,
};
