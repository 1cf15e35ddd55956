//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use taxbridge_common::auth::CredentialError;
use taxbridge_domain::TaxBridgeError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub TaxBridgeError);

impl From<InfraError> for TaxBridgeError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<TaxBridgeError> for InfraError {
    fn from(value: TaxBridgeError) -> Self {
        InfraError(value)
    }
}

trait IntoTaxBridgeError {
    fn into_taxbridge(self) -> TaxBridgeError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TaxBridgeError */
/* -------------------------------------------------------------------------- */

impl IntoTaxBridgeError for HttpError {
    fn into_taxbridge(self) -> TaxBridgeError {
        if self.is_timeout() {
            return TaxBridgeError::Transport("HTTP request timed out".into());
        }

        if self.is_connect() {
            return TaxBridgeError::Transport(format!("HTTP connection failure: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => TaxBridgeError::Auth(message),
                _ => TaxBridgeError::RemoteRejection {
                    status: code,
                    code: status.canonical_reason().unwrap_or("Unknown").to_string(),
                    message,
                },
            };
        }

        if self.is_builder() {
            return TaxBridgeError::Internal(format!("invalid HTTP request: {self}"));
        }

        if self.is_decode() {
            return TaxBridgeError::Internal(format!("failed to decode HTTP response: {self}"));
        }

        TaxBridgeError::Transport(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_taxbridge())
    }
}

/* -------------------------------------------------------------------------- */
/* CredentialError → TaxBridgeError */
/* -------------------------------------------------------------------------- */

impl IntoTaxBridgeError for CredentialError {
    fn into_taxbridge(self) -> TaxBridgeError {
        match self {
            CredentialError::Config(message) => TaxBridgeError::Config(message),
            other => TaxBridgeError::Auth(format!("failed to obtain access token: {other}")),
        }
    }
}

impl From<CredentialError> for InfraError {
    fn from(value: CredentialError) -> Self {
        InfraError(value.into_taxbridge())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use reqwest::{Client, StatusCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn status_error(status: StatusCode) -> HttpError {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err()
    }

    #[tokio::test]
    async fn http_status_401_maps_to_auth_error() {
        let mapped: TaxBridgeError = InfraError::from(status_error(StatusCode::UNAUTHORIZED).await).into();
        match mapped {
            TaxBridgeError::Auth(msg) => assert!(msg.contains("401")),
            other => panic!("expected auth error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_status_503_is_retryable_rejection() {
        let mapped: TaxBridgeError =
            InfraError::from(status_error(StatusCode::SERVICE_UNAVAILABLE).await).into();
        assert!(matches!(mapped, TaxBridgeError::RemoteRejection { status: 503, .. }));
        assert!(mapped.is_retryable());
    }

    #[tokio::test]
    async fn connection_refused_maps_to_transport() {
        let client = Client::builder().no_proxy().build().unwrap();
        let err = client.get("http://127.0.0.1:9").send().await.unwrap_err();

        let mapped: TaxBridgeError = InfraError::from(err).into();
        assert!(matches!(mapped, TaxBridgeError::Transport(_)));
        assert!(mapped.is_retryable());
    }

    #[test]
    fn credential_rejection_maps_to_auth() {
        let err = CredentialError::Rejected {
            status: 400,
            error: "invalid_client".into(),
            description: None,
        };
        let mapped: TaxBridgeError = InfraError::from(err).into();
        match mapped {
            TaxBridgeError::Auth(msg) => assert!(msg.contains("invalid_client")),
            other => panic!("expected auth error, got {other:?}"),
        }
    }
}
