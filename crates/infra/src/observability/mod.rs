//! Observability infrastructure
//!
//! Structured logging via `tracing`. Pipeline components emit fields such as
//! `submission_id`, `attempt` and `external_id`; this module installs the
//! subscriber that renders them.

pub mod logging;

pub use logging::{init_tracing, init_tracing_with_filter, LogFormat};
