//! Bearer tokens for the intake client
//!
//! Wires [`CredentialManager`] into the client's [`AccessTokenProvider`] seam
//! so every intake call shares the single process-wide credential.

use async_trait::async_trait;
use taxbridge_common::auth::{
    ClientCredentialsClient, ClientCredentialsConfig, CredentialManager, TokenIssuer,
};
use taxbridge_common::Clock;
use taxbridge_domain::{Config, Result, TaxBridgeError};

use super::client::AccessTokenProvider;
use crate::errors::InfraError;

/// Credential manager backed by the real client-credentials endpoint.
pub type IntakeCredentialManager = CredentialManager<ClientCredentialsClient>;

/// Build the token issuer for the configured identity service.
pub fn create_token_issuer(config: &Config) -> Result<ClientCredentialsClient> {
    let grant = ClientCredentialsConfig::new(
        config.intake.identity_base_url(),
        config.credentials.client_id.clone(),
        config.credentials.client_secret.clone(),
        config.credentials.scope.clone(),
    );
    ClientCredentialsClient::new(grant).map_err(|e| TaxBridgeError::from(InfraError::from(e)))
}

#[async_trait]
impl<I, C> AccessTokenProvider for CredentialManager<I, C>
where
    I: TokenIssuer + 'static,
    C: Clock + 'static,
{
    async fn access_token(&self) -> Result<String> {
        self.get_token().await.map_err(|e| InfraError::from(e).into())
    }

    async fn renew_token(&self) -> Result<String> {
        self.renew().await.map(|credential| credential.token).map_err(|e| InfraError::from(e).into())
    }
}

#[cfg(test)]
mod tests {
    use taxbridge_common::auth::CredentialError;
    use taxbridge_common::testing::mocks::MockTokenIssuer;

    use super::*;

    #[tokio::test]
    async fn manager_supplies_cached_token() {
        let issuer = MockTokenIssuer::new(3600);
        let manager = CredentialManager::new(issuer.clone(), 300);

        assert_eq!(manager.access_token().await.unwrap(), "token-1");
        assert_eq!(manager.access_token().await.unwrap(), "token-1");
        assert_eq!(issuer.call_count(), 1);
        manager.shutdown();
    }

    #[tokio::test]
    async fn renew_token_always_issues() {
        let issuer = MockTokenIssuer::new(3600);
        let manager = CredentialManager::new(issuer.clone(), 300);

        manager.access_token().await.unwrap();
        assert_eq!(manager.renew_token().await.unwrap(), "token-2");
        manager.shutdown();
    }

    #[tokio::test]
    async fn issuance_failure_maps_to_auth_error() {
        let issuer = MockTokenIssuer::new(3600);
        issuer.fail_next(CredentialError::Rejected {
            status: 401,
            error: "invalid_client".into(),
            description: None,
        });
        let manager = CredentialManager::new(issuer, 300);

        let err = manager.access_token().await.unwrap_err();
        assert!(matches!(err, TaxBridgeError::Auth(_)));
        manager.shutdown();
    }

    #[test]
    fn issuer_targets_identity_base_url() {
        let config: Config = toml::from_str(
            r#"
            [intake]
            base_url = "https://api.example.gov"
            identity_base_url = "https://id.example.gov/"

            [credentials]
            client_id = "client"
            client_secret = "secret"
            "#,
        )
        .unwrap();

        let issuer = create_token_issuer(&config).unwrap();
        assert_eq!(issuer.config().token_url(), "https://id.example.gov/connect/token");
    }
}
