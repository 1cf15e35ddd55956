//! Credential manager with single-flight renewal
//!
//! Owns the one live [`Credential`] for the process:
//! - Lazy renewal when a caller finds the credential inside the refresh window
//! - Proactive one-shot timer armed after every successful renewal
//! - Concurrent renewals collapse into a single token request

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex as SyncMutex;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::client::CredentialError;
use super::traits::TokenIssuer;
use super::types::Credential;
use crate::testing::time::{Clock, SystemClock};

/// Default refresh window before expiry (5 minutes)
pub const DEFAULT_REFRESH_THRESHOLD_SECS: i64 = 300;

/// Floor for the proactive renewal delay
pub const MIN_PROACTIVE_RENEWAL_DELAY_SECS: i64 = 30;

/// Credential manager shared by every intake call.
///
/// Cheap to clone; all clones observe the same credential. The proactive
/// timer holds only a weak reference, so dropping the last clone stops it.
pub struct CredentialManager<I: TokenIssuer + 'static, C: Clock + 'static = SystemClock> {
    inner: Arc<Inner<I, C>>,
}

impl<I: TokenIssuer + 'static, C: Clock + 'static> Clone for CredentialManager<I, C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

struct Inner<I, C> {
    issuer: I,
    clock: C,
    refresh_threshold_seconds: i64,
    current: RwLock<Option<Credential>>,
    renewal_lock: Mutex<()>,
    renewals: AtomicU64,
    timer: SyncMutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl<I: TokenIssuer + 'static> CredentialManager<I, SystemClock> {
    /// Create a manager driven by the system clock.
    #[must_use]
    pub fn new(issuer: I, refresh_threshold_seconds: i64) -> Self {
        Self::with_clock(issuer, SystemClock, refresh_threshold_seconds)
    }
}

impl<I: TokenIssuer + 'static, C: Clock + 'static> CredentialManager<I, C> {
    /// Create a manager with an explicit clock.
    #[must_use]
    pub fn with_clock(issuer: I, clock: C, refresh_threshold_seconds: i64) -> Self {
        Self {
            inner: Arc::new(Inner {
                issuer,
                clock,
                refresh_threshold_seconds,
                current: RwLock::new(None),
                renewal_lock: Mutex::new(()),
                renewals: AtomicU64::new(0),
                timer: SyncMutex::new(None),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Current bearer token, renewing first if the credential is missing or
    /// inside the refresh window.
    ///
    /// # Errors
    /// Returns the issuer's error if a required renewal fails.
    pub async fn get_token(&self) -> Result<String, CredentialError> {
        if let Some(token) = self.inner.fresh_token().await {
            return Ok(token);
        }

        let generation = self.inner.renewals.load(Ordering::Acquire);
        let credential = self.inner.renew(generation, true).await?;
        Ok(credential.token)
    }

    /// Force a renewal. Callers that queue behind an in-flight renewal
    /// receive its result instead of issuing another request.
    ///
    /// # Errors
    /// Returns the issuer's error if the token request fails.
    pub async fn renew(&self) -> Result<Credential, CredentialError> {
        let generation = self.inner.renewals.load(Ordering::Acquire);
        self.inner.renew(generation, false).await
    }

    /// Snapshot of the live credential without renewing.
    pub async fn current(&self) -> Option<Credential> {
        self.inner.current.read().await.clone()
    }

    /// Seconds until the live credential expires, if one exists.
    pub async fn seconds_until_expiry(&self) -> Option<i64> {
        let now = self.inner.clock.utc_now();
        self.inner.current.read().await.as_ref().map(|c| c.seconds_until_expiry(now))
    }

    /// Number of successful renewals since construction.
    #[must_use]
    pub fn renewal_count(&self) -> u64 {
        self.inner.renewals.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn refresh_threshold_seconds(&self) -> i64 {
        self.inner.refresh_threshold_seconds
    }

    /// Stop the proactive timer. Lazy renewal keeps working.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        if let Some(handle) = self.inner.timer.lock().take() {
            handle.abort();
        }
        debug!("credential manager shut down");
    }
}

impl<I: TokenIssuer + 'static, C: Clock + 'static> Inner<I, C> {
    async fn fresh_token(&self) -> Option<String> {
        let now = self.clock.utc_now();
        let current = self.current.read().await;
        current
            .as_ref()
            .filter(|c| !c.needs_renewal(now, self.refresh_threshold_seconds))
            .map(|c| c.token.clone())
    }

    /// Single-flighted renewal. `observed` is the renewal generation the
    /// caller saw before queueing; if it moved while waiting, the winner's
    /// credential is returned.
    async fn renew(
        self: &Arc<Self>,
        observed: u64,
        lazy: bool,
    ) -> Result<Credential, CredentialError> {
        let _guard = self.renewal_lock.lock().await;

        if self.renewals.load(Ordering::Acquire) != observed {
            if let Some(credential) = self.current.read().await.clone() {
                debug!("renewal completed by another caller");
                return Ok(credential);
            }
        }

        if lazy {
            let now = self.clock.utc_now();
            if let Some(credential) = self.current.read().await.as_ref() {
                if !credential.needs_renewal(now, self.refresh_threshold_seconds) {
                    return Ok(credential.clone());
                }
            }
        }

        let response = self.issuer.issue_token().await.map_err(|err| {
            warn!(error = %err, "credential renewal failed");
            err
        })?;

        let credential =
            Credential::new(response.access_token, self.clock.utc_now(), response.expires_in);
        *self.current.write().await = Some(credential.clone());
        let generation = self.renewals.fetch_add(1, Ordering::AcqRel) + 1;

        info!(
            generation,
            ttl_seconds = credential.ttl_seconds,
            expires_at = %credential.expires_at(),
            "credential renewed"
        );

        self.arm_timer(generation, credential.ttl_seconds);
        Ok(credential)
    }

    fn arm_timer(self: &Arc<Self>, generation: u64, ttl_seconds: i64) {
        if self.shutdown.is_cancelled() {
            return;
        }

        let delay_secs = (ttl_seconds - self.refresh_threshold_seconds)
            .max(MIN_PROACTIVE_RENEWAL_DELAY_SECS)
            .unsigned_abs();
        let weak: Weak<Self> = Arc::downgrade(self);
        let cancel = self.shutdown.child_token();

        let handle = tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(Duration::from_secs(delay_secs)) => {
                    let Some(inner) = weak.upgrade() else { return };
                    if inner.renewals.load(Ordering::Acquire) != generation {
                        return;
                    }
                    debug!(generation, "proactive credential renewal");
                    if let Err(err) = inner.renew(generation, false).await {
                        warn!(error = %err, "proactive renewal failed; next caller will renew");
                    }
                }
            }
        });

        if let Some(previous) = self.timer.lock().replace(handle) {
            previous.abort();
        }
    }
}

impl<I, C> Drop for Inner<I, C> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::MockTokenIssuer;
    use crate::testing::time::MockClock;

    fn manager(issuer: MockTokenIssuer, clock: MockClock) -> CredentialManager<MockTokenIssuer, MockClock> {
        CredentialManager::with_clock(issuer, clock, DEFAULT_REFRESH_THRESHOLD_SECS)
    }

    #[tokio::test]
    async fn first_call_issues_token() {
        let issuer = MockTokenIssuer::new(600);
        let manager = manager(issuer.clone(), MockClock::new());

        assert_eq!(manager.get_token().await.unwrap(), "token-1");
        assert_eq!(issuer.call_count(), 1);
        assert_eq!(manager.renewal_count(), 1);
        manager.shutdown();
    }

    #[tokio::test]
    async fn fresh_credential_is_reused() {
        let issuer = MockTokenIssuer::new(600);
        let manager = manager(issuer.clone(), MockClock::new());

        manager.get_token().await.unwrap();
        manager.get_token().await.unwrap();
        assert_eq!(issuer.call_count(), 1);
        manager.shutdown();
    }

    #[tokio::test]
    async fn renewal_boundary_follows_threshold() {
        let issuer = MockTokenIssuer::new(600);
        let clock = MockClock::new();
        let manager = manager(issuer.clone(), clock.clone());
        manager.get_token().await.unwrap();

        clock.advance(Duration::from_secs(299));
        assert_eq!(manager.get_token().await.unwrap(), "token-1");
        assert_eq!(issuer.call_count(), 1);

        clock.advance(Duration::from_secs(2));
        assert_eq!(manager.get_token().await.unwrap(), "token-2");
        assert_eq!(issuer.call_count(), 2);
        manager.shutdown();
    }

    #[tokio::test]
    async fn failed_renewal_surfaces_error_and_next_call_retries() {
        let issuer = MockTokenIssuer::new(600);
        issuer.fail_next(CredentialError::Transport("connection refused".into()));
        let manager = manager(issuer.clone(), MockClock::new());

        assert!(matches!(manager.get_token().await, Err(CredentialError::Transport(_))));
        assert!(manager.current().await.is_none());

        assert_eq!(manager.get_token().await.unwrap(), "token-2");
        assert_eq!(manager.renewal_count(), 1);
        manager.shutdown();
    }

    #[tokio::test]
    async fn forced_renew_replaces_credential() {
        let issuer = MockTokenIssuer::new(600);
        let manager = manager(issuer.clone(), MockClock::new());

        manager.get_token().await.unwrap();
        let renewed = manager.renew().await.unwrap();
        assert_eq!(renewed.token, "token-2");
        assert_eq!(manager.get_token().await.unwrap(), "token-2");
        manager.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn proactive_timer_renews_without_callers() {
        let issuer = MockTokenIssuer::new(600);
        let manager = manager(issuer.clone(), MockClock::new());
        manager.get_token().await.unwrap();

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert_eq!(issuer.call_count(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(issuer.call_count(), 2);
        manager.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn short_ttl_uses_minimum_delay() {
        let issuer = MockTokenIssuer::new(120);
        let manager = manager(issuer.clone(), MockClock::new());
        manager.get_token().await.unwrap();

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(issuer.call_count(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(issuer.call_count(), 2);
        manager.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_proactive_timer() {
        let issuer = MockTokenIssuer::new(600);
        let manager = manager(issuer.clone(), MockClock::new());
        manager.get_token().await.unwrap();
        manager.shutdown();

        tokio::time::sleep(Duration::from_secs(1_000)).await;
        tokio::task::yield_now().await;
        assert_eq!(issuer.call_count(), 1);
    }

    #[tokio::test]
    async fn seconds_until_expiry_tracks_clock() {
        let clock = MockClock::new();
        let manager = manager(MockTokenIssuer::new(600), clock.clone());
        assert_eq!(manager.seconds_until_expiry().await, None);

        manager.get_token().await.unwrap();
        clock.advance(Duration::from_secs(100));
        assert_eq!(manager.seconds_until_expiry().await, Some(500));
        manager.shutdown();
    }
}
