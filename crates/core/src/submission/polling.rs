//! Submission status polling
//!
//! A submission starts `InProgress` and is polled at a fixed interval until
//! the intake service reports a terminal overall status or the attempt
//! budget runs out. Two escapes avoid a hard failure for documents that are
//! past the rejection window in practice:
//!
//! - **Heuristic**: from `min_attempt` on, once every expected document has
//!   reported `required_sub_status` for `required_streak` consecutive
//!   attempts, stop and report success.
//! - **Optimistic**: on exhaustion, report the last non-empty document
//!   summary instead of failing. `PollingTimeout` is raised only when no
//!   summary was ever observed.

use std::sync::Arc;

use taxbridge_domain::{
    DocumentSummary, HeuristicConfig, OverallStatus, PollingConfig, Result, SubmissionStatus,
    TaxBridgeError,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ports::SubmissionGateway;

/// How polling stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollResolution {
    /// The remote reported a terminal overall status.
    Terminal,
    /// Stopped early on the sub-status streak.
    Heuristic,
    /// Budget exhausted; last observed summary reported as-is.
    Optimistic,
}

/// Result of a completed polling run
#[derive(Debug, Clone)]
pub struct PollResult {
    pub status: OverallStatus,
    pub final_summary: Vec<DocumentSummary>,
    pub attempts: u32,
    pub resolution: PollResolution,
}

impl PollResult {
    /// Summary entry for a document UUID.
    #[must_use]
    pub fn summary_for(&self, uuid: &str) -> Option<&DocumentSummary> {
        self.final_summary.iter().find(|s| s.uuid == uuid)
    }

    fn from_status(status: SubmissionStatus, attempts: u32, resolution: PollResolution) -> Self {
        Self {
            status: status.overall_status,
            final_summary: status.document_summary,
            attempts,
            resolution,
        }
    }
}

/// Polls one submission at a time; share it between batches freely.
pub struct PollingStateMachine {
    gateway: Arc<dyn SubmissionGateway>,
    config: PollingConfig,
}

impl PollingStateMachine {
    pub fn new(gateway: Arc<dyn SubmissionGateway>, config: PollingConfig) -> Self {
        Self { gateway, config }
    }

    #[must_use]
    pub fn config(&self) -> &PollingConfig {
        &self.config
    }

    /// Poll `submission_id` until it resolves.
    ///
    /// Waits one interval before every attempt. Transport and retryable
    /// remote errors consume an attempt; any other error aborts.
    ///
    /// # Errors
    /// - `TaxBridgeError::Cancelled` if `cancel` fires
    /// - `TaxBridgeError::PollingTimeout` if the budget is exhausted and no
    ///   document summary was ever returned
    /// - any non-retryable gateway error
    pub async fn poll(
        &self,
        submission_id: &str,
        expected: &[String],
        cancel: &CancellationToken,
    ) -> Result<PollResult> {
        let interval = self.config.interval();
        let max_attempts = self.config.max_attempts.max(1);
        let mut streak = 0_u32;
        let mut last_observed: Option<SubmissionStatus> = None;

        for attempt in 1..=max_attempts {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!(submission_id, attempt, "polling cancelled");
                    return Err(TaxBridgeError::Cancelled);
                }
                () = tokio::time::sleep(interval) => {}
            }

            let status = match self.gateway.submission_status(submission_id).await {
                Ok(status) => status,
                Err(err) if err.is_retryable() => {
                    warn!(submission_id, attempt, error = %err, "status query failed; will retry");
                    streak = 0;
                    continue;
                }
                Err(err) => return Err(err),
            };

            debug!(
                submission_id,
                attempt,
                overall_status = %status.overall_status,
                documents = status.document_summary.len(),
                "submission status"
            );

            if status.overall_status.is_terminal() {
                info!(submission_id, attempt, overall_status = %status.overall_status, "submission resolved");
                return Ok(PollResult::from_status(status, attempt, PollResolution::Terminal));
            }

            if let Some(heuristic) = &self.config.heuristic {
                streak = if all_report(&status.document_summary, expected, heuristic) {
                    streak + 1
                } else {
                    0
                };

                if attempt >= heuristic.min_attempt && streak >= heuristic.required_streak.max(1) {
                    info!(
                        submission_id,
                        attempt,
                        streak,
                        sub_status = %heuristic.required_sub_status,
                        "treating long-running submission as accepted"
                    );
                    return Ok(PollResult::from_status(status, attempt, PollResolution::Heuristic));
                }
            }

            if !status.document_summary.is_empty() {
                last_observed = Some(status);
            }
        }

        match last_observed {
            Some(status) => {
                warn!(
                    submission_id,
                    attempts = max_attempts,
                    "polling budget exhausted; reporting last observed summary"
                );
                Ok(PollResult::from_status(status, max_attempts, PollResolution::Optimistic))
            }
            None => Err(TaxBridgeError::PollingTimeout {
                submission_id: submission_id.to_string(),
                attempts: max_attempts,
            }),
        }
    }
}

/// Every expected document is present and reports the configured sub-status.
/// With no expected list, every reported document must match.
fn all_report(summary: &[DocumentSummary], expected: &[String], heuristic: &HeuristicConfig) -> bool {
    if summary.is_empty() {
        return false;
    }
    let matches = |s: &DocumentSummary| s.status.matches(&heuristic.required_sub_status);

    if expected.is_empty() {
        summary.iter().all(matches)
    } else {
        expected
            .iter()
            .all(|uuid| summary.iter().any(|s| s.uuid == *uuid && matches(s)))
    }
}
