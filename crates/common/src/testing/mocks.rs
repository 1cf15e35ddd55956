//! Mock implementations of common traits

#![allow(clippy::missing_panics_doc)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::auth::{CredentialError, TokenIssuer, TokenResponse};

/// Scripted token issuer.
///
/// Issues `token-1`, `token-2`, ... with a fixed TTL. Failures queued with
/// [`fail_next`](Self::fail_next) are returned before any token. The call
/// counter includes failed calls.
#[derive(Debug, Clone)]
pub struct MockTokenIssuer {
    ttl_seconds: i64,
    latency: Duration,
    calls: Arc<AtomicUsize>,
    failures: Arc<Mutex<VecDeque<CredentialError>>>,
}

impl MockTokenIssuer {
    #[must_use]
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            ttl_seconds,
            latency: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            failures: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Delay every issuance, to widen race windows in concurrency tests.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn fail_next(&self, error: CredentialError) {
        self.failures.lock().push_back(error);
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenIssuer for MockTokenIssuer {
    async fn issue_token(&self) -> Result<TokenResponse, CredentialError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(error) = self.failures.lock().pop_front() {
            return Err(error);
        }
        Ok(TokenResponse {
            access_token: format!("token-{call}"),
            expires_in: self.ttl_seconds,
            token_type: "Bearer".to_string(),
            scope: None,
        })
    }
}
