//! Document submission pipeline
//!
//! `BatchOrchestrator` validates and encodes invoice items, submits them in
//! one call, and drives `PollingStateMachine` until the intake service
//! reports a usable status.

pub mod orchestrator;
pub mod polling;
pub mod ports;
pub mod validation;

pub use orchestrator::BatchOrchestrator;
pub use polling::{PollResolution, PollResult, PollingStateMachine};
pub use ports::{CustomerDirectory, DocumentCodec, SubmissionGateway};
