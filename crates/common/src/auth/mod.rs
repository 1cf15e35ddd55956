//! Credential lifecycle for the intake service
//!
//! - **[`client`]**: OAuth 2.0 client-credentials exchange
//! - **[`token_manager`]**: the shared [`CredentialManager`]
//! - **[`traits`]**: [`TokenIssuer`] seam for tests
//! - **[`types`]**: credential and token wire types

pub mod client;
pub mod token_manager;
pub mod traits;
pub mod types;

pub use client::{ClientCredentialsClient, CredentialError};
pub use token_manager::{
    CredentialManager, DEFAULT_REFRESH_THRESHOLD_SECS, MIN_PROACTIVE_RENEWAL_DELAY_SECS,
};
pub use traits::TokenIssuer;
pub use types::{ClientCredentialsConfig, Credential, TokenErrorBody, TokenResponse};
