//! Per-item outcomes returned to the caller for persistence.

use serde::{Deserialize, Serialize};

use super::submission::OverallStatus;

/// Where an item ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeStage {
    LocalValidationFailed,
    Accepted,
    Rejected,
    TimedOut,
}

/// How the stage was established.
///
/// Callers auditing outcomes can tell a remote-confirmed terminal state
/// apart from one inferred by the polling heuristic or reported from the
/// last known summary after the attempt budget ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeEvidence {
    /// Decided locally, never sent.
    Local,
    /// Rejected synchronously by the submit call.
    Immediate,
    /// Terminal status reported by the remote service.
    Confirmed,
    /// Inferred from a long run of accepted-by-intake sub-statuses.
    Heuristic,
    /// Last observed summary, reported after the attempt budget ran out.
    Optimistic,
    /// Attempt budget exhausted without usable status.
    Exhausted,
    /// Polling stopped early by cancellation or a non-retryable error.
    Interrupted,
}

/// Exactly one per input item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentOutcome {
    pub external_id: String,
    pub stage: OutcomeStage,
    pub evidence: OutcomeEvidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_term_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl DocumentOutcome {
    fn bare(external_id: impl Into<String>, stage: OutcomeStage, evidence: OutcomeEvidence) -> Self {
        Self {
            external_id: external_id.into(),
            stage,
            evidence,
            remote_id: None,
            long_term_id: None,
            error_code: None,
            error_message: None,
        }
    }

    /// Item never left the process.
    pub fn local_failure(external_id: impl Into<String>, message: impl Into<String>) -> Self {
        let mut outcome =
            Self::bare(external_id, OutcomeStage::LocalValidationFailed, OutcomeEvidence::Local);
        outcome.error_code = Some("LOCAL_VALIDATION".to_string());
        outcome.error_message = Some(message.into());
        outcome
    }

    /// Item never left the process because customer reference data could
    /// not be read. Unlike a missing customer, retrying may succeed.
    pub fn reference_lookup_failure(
        external_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut outcome = Self::local_failure(external_id, message);
        outcome.error_code = Some("REFERENCE_LOOKUP".to_string());
        outcome
    }

    pub fn accepted(
        external_id: impl Into<String>,
        remote_id: impl Into<String>,
        long_term_id: Option<String>,
        evidence: OutcomeEvidence,
    ) -> Self {
        let mut outcome = Self::bare(external_id, OutcomeStage::Accepted, evidence);
        outcome.remote_id = Some(remote_id.into());
        outcome.long_term_id = long_term_id;
        outcome
    }

    pub fn rejected(
        external_id: impl Into<String>,
        remote_id: Option<String>,
        code: impl Into<String>,
        message: impl Into<String>,
        evidence: OutcomeEvidence,
    ) -> Self {
        let mut outcome = Self::bare(external_id, OutcomeStage::Rejected, evidence);
        outcome.remote_id = remote_id;
        outcome.error_code = Some(code.into());
        outcome.error_message = Some(message.into());
        outcome
    }

    pub fn timed_out(
        external_id: impl Into<String>,
        remote_id: Option<String>,
        evidence: OutcomeEvidence,
    ) -> Self {
        let mut outcome = Self::bare(external_id, OutcomeStage::TimedOut, evidence);
        outcome.remote_id = remote_id;
        outcome
    }

    /// Sent and acknowledged, but polling stopped before a status was
    /// settled. `code` and `message` describe what stopped it.
    pub fn interrupted(
        external_id: impl Into<String>,
        remote_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut outcome =
            Self::bare(external_id, OutcomeStage::TimedOut, OutcomeEvidence::Interrupted);
        outcome.remote_id = Some(remote_id.into());
        outcome.error_code = Some(code.into());
        outcome.error_message = Some(message.into());
        outcome
    }

    /// True for outcomes that were not confirmed by a terminal remote status.
    pub fn is_inferred(&self) -> bool {
        matches!(self.evidence, OutcomeEvidence::Heuristic | OutcomeEvidence::Optimistic)
    }
}

impl OverallStatus {
    /// Derive a batch status from its outcomes.
    ///
    /// `Invalid` when nothing got through (this includes an empty batch),
    /// `Valid` when everything was accepted, `Partial` otherwise.
    pub fn derive(outcomes: &[DocumentOutcome]) -> Self {
        let failed = |o: &DocumentOutcome| {
            matches!(o.stage, OutcomeStage::LocalValidationFailed | OutcomeStage::Rejected)
        };

        if outcomes.iter().all(failed) {
            Self::Invalid
        } else if outcomes.iter().all(|o| o.stage == OutcomeStage::Accepted) {
            Self::Valid
        } else {
            Self::Partial
        }
    }
}

/// Everything the caller needs to persist after one `submit_batch` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Absent when nothing was sent.
    pub submission_id: Option<String>,
    pub outcomes: Vec<DocumentOutcome>,
}

impl BatchReport {
    pub fn overall_status(&self) -> OverallStatus {
        OverallStatus::derive(&self.outcomes)
    }

    pub fn count(&self, stage: OutcomeStage) -> usize {
        self.outcomes.iter().filter(|o| o.stage == stage).count()
    }
}
