//! Token and connectivity probe for diagnostics
//!
//! One-shot check that the identity service issues a credential and the
//! intake host answers. Never fails: every problem lands in the report.

use serde::Serialize;
use taxbridge_common::auth::{CredentialManager, TokenIssuer};
use taxbridge_common::Clock;
use tracing::{info, warn};

use super::client::IntakeClient;
use crate::errors::InfraError;

/// Result of [`probe`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectivityReport {
    pub token_ok: bool,
    pub token_expires_in_secs: Option<i64>,
    pub intake_reachable: bool,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

impl ConnectivityReport {
    pub fn is_healthy(&self) -> bool {
        self.token_ok && self.intake_reachable
    }
}

/// Obtain a token through `credentials` and check that the intake host is
/// reachable.
pub async fn probe<I, C>(client: &IntakeClient, credentials: &CredentialManager<I, C>) -> ConnectivityReport
where
    I: TokenIssuer + 'static,
    C: Clock + 'static,
{
    let mut errors = Vec::new();

    let token_ok = match credentials.get_token().await {
        Ok(_) => true,
        Err(e) => {
            errors.push(taxbridge_domain::TaxBridgeError::from(InfraError::from(e)).to_string());
            false
        }
    };
    let token_expires_in_secs =
        if token_ok { credentials.seconds_until_expiry().await } else { None };

    let (intake_reachable, latency_ms) = match client.check_reachable().await {
        Ok(Some(latency)) => (true, Some(u64::try_from(latency.as_millis()).unwrap_or(u64::MAX))),
        Ok(None) => {
            errors.push(format!("intake service at {} is unreachable", client.base_url()));
            (false, None)
        }
        Err(e) => {
            errors.push(e.to_string());
            (false, None)
        }
    };

    let report = ConnectivityReport {
        token_ok,
        token_expires_in_secs,
        intake_reachable,
        latency_ms,
        error: (!errors.is_empty()).then(|| errors.join("; ")),
    };

    if report.is_healthy() {
        info!(latency_ms = ?report.latency_ms, expires_in = ?report.token_expires_in_secs, "connectivity probe passed");
    } else {
        warn!(error = ?report.error, "connectivity probe failed");
    }
    report
}
