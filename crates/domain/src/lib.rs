//! # TaxBridge Domain
//!
//! Business domain types for the e-invoice submission pipeline.
//!
//! This crate contains:
//! - Invoice, document, submission and outcome types
//! - Domain error type and Result definition
//! - Configuration structures
//! - Protocol constants
//!
//! ## Architecture
//! - No dependencies on other TaxBridge crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
