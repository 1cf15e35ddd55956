//! # TaxBridge Infrastructure
//!
//! Infrastructure implementations of the core submission ports.
//!
//! This crate contains:
//! - HTTP client with bounded retries for idempotent calls
//! - The intake service integration (client, codec, cache, probe)
//! - Configuration loading from environment and files
//! - Tracing subscriber setup
//!
//! ## Architecture
//! - Implements traits defined in `taxbridge-core`
//! - Depends on `taxbridge-common` for the credential lifecycle
//! - Contains all "impure" code (network, files, environment)

pub mod config;
pub mod context;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod observability;

// Re-export commonly used items
pub use context::SubmissionContext;
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use integrations::intake::{ConnectivityReport, IntakeClient, JsonDocumentCodec};
pub use observability::{init_tracing, LogFormat};
