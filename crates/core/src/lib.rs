//! # TaxBridge Core
//!
//! Submission pipeline logic with no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces for the intake gateway, codec and reference data
//! - Local validation rules
//! - The polling state machine and the batch orchestrator
//!
//! ## Architecture Principles
//! - Only depends on `taxbridge-domain`
//! - No HTTP or storage code
//! - All external collaborators via traits

pub mod submission;

pub use submission::orchestrator::BatchOrchestrator;
pub use submission::polling::{PollResolution, PollResult, PollingStateMachine};
pub use submission::ports::{CustomerDirectory, DocumentCodec, SubmissionGateway};
pub use submission::validation::{validate_customer, validate_item, FieldViolation};
