//! Credential types
//!
//! A [`Credential`] is the single bearer token shared by every call to the
//! intake service. It is replaced on renewal, never mutated.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Bearer credential with its issuance metadata.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub ttl_seconds: i64,
}

impl Credential {
    #[must_use]
    pub fn new(token: String, issued_at: DateTime<Utc>, ttl_seconds: i64) -> Self {
        Self { token, issued_at, ttl_seconds }
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + Duration::seconds(self.ttl_seconds)
    }

    /// True once `now` is within `threshold_seconds` of expiry.
    #[must_use]
    pub fn needs_renewal(&self, now: DateTime<Utc>, threshold_seconds: i64) -> bool {
        now >= self.expires_at() - Duration::seconds(threshold_seconds)
    }

    /// Seconds left before expiry (negative once expired).
    #[must_use]
    pub fn seconds_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at() - now).num_seconds()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

/// Token endpoint response (RFC 6749 §5.1).
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Token endpoint error body (RFC 6749 §5.2).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// OAuth2 client-credentials grant settings.
#[derive(Clone)]
pub struct ClientCredentialsConfig {
    pub identity_base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
}

impl ClientCredentialsConfig {
    #[must_use]
    pub fn new(
        identity_base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            identity_base_url: identity_base_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: scope.into(),
        }
    }

    /// `{identity_base_url}/connect/token`
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/connect/token", self.identity_base_url.trim_end_matches('/'))
    }
}

impl fmt::Debug for ClientCredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentialsConfig")
            .field("identity_base_url", &self.identity_base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scope", &self.scope)
            .finish()
    }
}
