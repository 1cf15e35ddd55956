//! Submission context
//!
//! Builds the pipeline once at startup: one credential manager shared by
//! every call, one intake client, the codec, the cached customer directory
//! and the orchestrator over them.

use std::sync::Arc;

use taxbridge_core::{BatchOrchestrator, CustomerDirectory};
use taxbridge_domain::{BatchReport, Config, DocumentFormat, InvoiceItem, Result, TaxBridgeError};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::validate;
use crate::http::HttpClient;
use crate::integrations::intake::{
    create_token_issuer, probe, CachedCustomerDirectory, ConnectivityReport, IntakeClient,
    IntakeCredentialManager, JsonDocumentCodec,
};

const USER_AGENT: &str = concat!("taxbridge/", env!("CARGO_PKG_VERSION"));

/// Wired submission pipeline.
pub struct SubmissionContext {
    config: Config,
    credentials: IntakeCredentialManager,
    client: Arc<IntakeClient>,
    directory: Arc<CachedCustomerDirectory>,
    orchestrator: BatchOrchestrator,
    shutdown: CancellationToken,
}

impl SubmissionContext {
    /// Wire the pipeline from `config`, looking customers up in `directory`.
    ///
    /// # Errors
    /// Returns `TaxBridgeError::Config` for invalid configuration or an
    /// unsupported document format.
    pub fn build(config: Config, directory: Arc<dyn CustomerDirectory>) -> Result<Self> {
        validate(&config)?;
        if config.encoding.format != DocumentFormat::Json {
            return Err(TaxBridgeError::Config(format!(
                "unsupported document format: {}",
                config.encoding.format
            )));
        }

        let issuer = create_token_issuer(&config)?;
        let credentials =
            IntakeCredentialManager::new(issuer, config.credentials.refresh_threshold_secs);

        let http = HttpClient::builder()
            .timeout(config.intake.request_timeout())
            .user_agent(USER_AGENT)
            .build()?;
        let client = Arc::new(IntakeClient::with_http_client(
            config.intake.base_url.clone(),
            http,
            Arc::new(credentials.clone()),
        ));

        let directory = Arc::new(CachedCustomerDirectory::new(directory, &config.reference_cache));
        let orchestrator = BatchOrchestrator::new(
            client.clone(),
            Arc::new(JsonDocumentCodec::new()),
            directory.clone(),
            config.polling.clone(),
        )
        .with_encode_concurrency(config.encoding.concurrency);

        info!(
            base_url = %config.intake.base_url,
            poll_interval_secs = config.polling.interval_secs,
            poll_max_attempts = config.polling.max_attempts,
            heuristic = config.polling.heuristic.is_some(),
            encode_concurrency = config.encoding.concurrency,
            "submission pipeline ready"
        );

        Ok(Self {
            config,
            credentials,
            client,
            directory,
            orchestrator,
            shutdown: CancellationToken::new(),
        })
    }

    /// Submit a batch; [`shutdown`](Self::shutdown) stops it early.
    pub async fn submit_batch(&self, items: &[InvoiceItem]) -> Result<BatchReport> {
        self.orchestrator.submit_batch_with_cancel(items, &self.shutdown.child_token()).await
    }

    /// Submit a batch, abortable through `cancel` or [`shutdown`](Self::shutdown).
    pub async fn submit_batch_with_cancel(
        &self,
        items: &[InvoiceItem],
        cancel: &CancellationToken,
    ) -> Result<BatchReport> {
        let combined = self.shutdown.child_token();
        let forward = cancel.clone();
        let linked = combined.clone();
        let link = tokio::spawn(async move {
            forward.cancelled().await;
            linked.cancel();
        });

        let result = self.orchestrator.submit_batch_with_cancel(items, &combined).await;
        link.abort();
        result
    }

    /// Token and connectivity check for diagnostics.
    pub async fn probe(&self) -> ConnectivityReport {
        probe(&self.client, &self.credentials).await
    }

    /// Cancel in-flight batches and stop the credential renewal timer.
    pub fn shutdown(&self) {
        let stats = self.directory.cache().stats();
        info!(
            cache_hits = stats.hits,
            cache_negative_hits = stats.negative_hits,
            cache_misses = stats.misses,
            "submission pipeline shutting down"
        );
        self.shutdown.cancel();
        self.credentials.shutdown();
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &IntakeClient {
        &self.client
    }

    pub fn credentials(&self) -> &IntakeCredentialManager {
        &self.credentials
    }

    pub fn customer_directory(&self) -> &CachedCustomerDirectory {
        &self.directory
    }
}

impl Drop for SubmissionContext {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.credentials.shutdown();
    }
}
