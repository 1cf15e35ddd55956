//! OAuth 2.0 client-credentials client
//!
//! Exchanges the service's client id and secret for a bearer token at
//! `{identity_base_url}/connect/token`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use super::traits::TokenIssuer;
use super::types::{ClientCredentialsConfig, TokenErrorBody, TokenResponse};

const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error type for credential issuance and renewal
#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    /// Identity service could not be reached
    #[error("token request failed: {0}")]
    Transport(String),

    /// Identity service answered with a non-2xx status
    #[error("token request rejected (HTTP {status}): {error}")]
    Rejected { status: u16, error: String, description: Option<String> },

    /// Successful status but unreadable body
    #[error("token response could not be parsed: {0}")]
    Parse(String),

    /// Client could not be constructed
    #[error("credential configuration error: {0}")]
    Config(String),
}

/// Client-credentials token client
#[derive(Debug, Clone)]
pub struct ClientCredentialsClient {
    config: ClientCredentialsConfig,
    client: Client,
}

impl ClientCredentialsClient {
    /// Create a client for the given identity service.
    ///
    /// # Errors
    /// Returns `CredentialError::Config` if the HTTP client cannot be built.
    pub fn new(config: ClientCredentialsConfig) -> Result<Self, CredentialError> {
        let client = Client::builder()
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CredentialError::Config(e.to_string()))?;

        Ok(Self { config, client })
    }

    #[must_use]
    pub fn config(&self) -> &ClientCredentialsConfig {
        &self.config
    }
}

#[async_trait]
impl TokenIssuer for ClientCredentialsClient {
    async fn issue_token(&self) -> Result<TokenResponse, CredentialError> {
        let url = self.config.token_url();
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("scope", self.config.scope.as_str()),
        ];

        debug!(%url, client_id = %self.config.client_id, "requesting client-credentials token");

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| CredentialError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| CredentialError::Transport(e.to_string()))?;

        if !status.is_success() {
            let (error, description) = match serde_json::from_str::<TokenErrorBody>(&body) {
                Ok(parsed) => (parsed.error, parsed.error_description),
                Err(_) => (body.chars().take(200).collect(), None),
            };
            return Err(CredentialError::Rejected { status: status.as_u16(), error, description });
        }

        serde_json::from_str::<TokenResponse>(&body)
            .map_err(|e| CredentialError::Parse(e.to_string()))
    }
}
