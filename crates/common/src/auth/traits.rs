//! Traits for credential issuance
//!
//! Abstracts the identity service so the credential manager can be driven
//! by a scripted issuer in tests.

use async_trait::async_trait;

use super::client::CredentialError;
use super::types::TokenResponse;

/// Issues fresh bearer tokens.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Perform one token exchange.
    ///
    /// # Errors
    /// Returns error if the identity service is unreachable, refuses the
    /// client credentials, or answers with an unreadable body.
    async fn issue_token(&self) -> Result<TokenResponse, CredentialError>;
}
