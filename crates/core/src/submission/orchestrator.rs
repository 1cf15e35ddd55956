//! Batch submission orchestrator
//!
//! Produces exactly one [`DocumentOutcome`] per input item, in input order.
//! Per-document failures never abort siblings; a failed submit call or an
//! authentication failure before it aborts the whole batch. Once the submit
//! call succeeds the batch always resolves to a report, so the submission id
//! and remote ids are never lost.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use taxbridge_domain::constants::DEFAULT_ENCODE_CONCURRENCY;
use taxbridge_domain::{
    BatchReport, Document, DocumentOutcome, DocumentStatus, DocumentSummary, InvoiceItem,
    OutcomeEvidence, PollingConfig, Result, SubmissionAck, TaxBridgeError,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::polling::{PollResolution, PollResult, PollingStateMachine};
use super::ports::{CustomerDirectory, DocumentCodec, SubmissionGateway};
use super::validation::{describe, validate_customer, validate_item};

/// Batch submission orchestrator
pub struct BatchOrchestrator {
    gateway: Arc<dyn SubmissionGateway>,
    codec: Arc<dyn DocumentCodec>,
    directory: Arc<dyn CustomerDirectory>,
    polling: PollingStateMachine,
    encode_concurrency: usize,
}

impl BatchOrchestrator {
    /// Create an orchestrator with the default encoding fan-out.
    pub fn new(
        gateway: Arc<dyn SubmissionGateway>,
        codec: Arc<dyn DocumentCodec>,
        directory: Arc<dyn CustomerDirectory>,
        polling: PollingConfig,
    ) -> Self {
        Self {
            polling: PollingStateMachine::new(Arc::clone(&gateway), polling),
            gateway,
            codec,
            directory,
            encode_concurrency: DEFAULT_ENCODE_CONCURRENCY,
        }
    }

    /// Cap on concurrent encodes (minimum 1).
    pub fn with_encode_concurrency(mut self, concurrency: usize) -> Self {
        self.encode_concurrency = concurrency.max(1);
        self
    }

    /// Submit `items` and wait for the intake service to resolve them.
    ///
    /// # Errors
    /// Returns error only for batch-global failures before anything was
    /// accepted remotely: authentication or a failed submit call. A
    /// non-retryable polling error leaves pending documents `TimedOut` with
    /// `Interrupted` evidence.
    pub async fn submit_batch(&self, items: &[InvoiceItem]) -> Result<BatchReport> {
        self.submit_batch_with_cancel(items, &CancellationToken::new()).await
    }

    /// Same as [`submit_batch`](Self::submit_batch), abortable through
    /// `cancel`.
    ///
    /// # Errors
    /// Additionally returns `TaxBridgeError::Cancelled` if `cancel` fires
    /// before the submit call. Cancellation while polling yields a report
    /// with the pending documents `Interrupted`.
    pub async fn submit_batch_with_cancel(
        &self,
        items: &[InvoiceItem],
        cancel: &CancellationToken,
    ) -> Result<BatchReport> {
        let mut slots: Vec<Option<DocumentOutcome>> = vec![None; items.len()];

        let valid = self.partition(items, &mut slots);
        let documents = self.encode_all(items, valid, &mut slots).await;

        if documents.is_empty() {
            info!(items = items.len(), "no documents passed local validation; nothing to submit");
            return Ok(BatchReport { submission_id: None, outcomes: fill(items, slots) });
        }

        if cancel.is_cancelled() {
            return Err(TaxBridgeError::Cancelled);
        }

        let sent: Vec<Document> = documents.iter().map(|(_, doc)| doc.clone()).collect();
        let ack = self.gateway.submit_documents(&sent).await?;
        let submission_id = ack.batch.submission_id.clone();

        info!(
            submission_id = %submission_id,
            sent = sent.len(),
            accepted = ack.accepted.len(),
            rejected = ack.rejected.len(),
            "batch submitted"
        );

        let pending = self.apply_ack(items, &documents, &ack, &mut slots);

        if !pending.is_empty() {
            let uuids: Vec<String> = pending.iter().map(|(_, uuid)| uuid.clone()).collect();
            match self.polling.poll(&submission_id, &uuids, cancel).await {
                Ok(result) => apply_poll(items, &pending, &result, &mut slots),
                Err(TaxBridgeError::PollingTimeout { attempts, .. }) => {
                    warn!(submission_id = %submission_id, attempts, "no status observed; documents timed out");
                    for (idx, uuid) in &pending {
                        slots[*idx] = Some(DocumentOutcome::timed_out(
                            items[*idx].external_id.as_str(),
                            Some(uuid.clone()),
                            OutcomeEvidence::Exhausted,
                        ));
                    }
                }
                Err(err) => {
                    warn!(submission_id = %submission_id, error = %err, "polling interrupted");
                    for (idx, uuid) in &pending {
                        slots[*idx] = Some(DocumentOutcome::interrupted(
                            items[*idx].external_id.as_str(),
                            uuid.as_str(),
                            err.label(),
                            err.to_string(),
                        ));
                    }
                }
            }
        } else {
            debug!(submission_id = %submission_id, "no documents accepted; skipping polling");
        }

        let report = BatchReport { submission_id: Some(submission_id), outcomes: fill(items, slots) };
        info!(
            submission_id = report.submission_id.as_deref().unwrap_or_default(),
            overall_status = %report.overall_status(),
            "batch resolved"
        );
        Ok(report)
    }

    /// Record local failures; return the indices that may be encoded.
    fn partition(&self, items: &[InvoiceItem], slots: &mut [Option<DocumentOutcome>]) -> Vec<usize> {
        let mut seen = HashSet::new();
        let mut valid = Vec::with_capacity(items.len());

        for (idx, item) in items.iter().enumerate() {
            let violations = validate_item(item);
            if !violations.is_empty() {
                debug!(external_id = %item.external_id, "item failed local validation");
                slots[idx] = Some(DocumentOutcome::local_failure(
                    item.external_id.as_str(),
                    describe(&violations),
                ));
            } else if !seen.insert(item.external_id.as_str()) {
                slots[idx] = Some(DocumentOutcome::local_failure(
                    item.external_id.as_str(),
                    "external_id: duplicated within batch",
                ));
            } else {
                valid.push(idx);
            }
        }

        valid
    }

    /// Encode valid items with bounded fan-out, preserving input order.
    async fn encode_all(
        &self,
        items: &[InvoiceItem],
        valid: Vec<usize>,
        slots: &mut [Option<DocumentOutcome>],
    ) -> Vec<(usize, Document)> {
        let results: Vec<(usize, std::result::Result<Document, EncodeFailure>)> = stream::iter(valid)
            .map(move |idx| async move { (idx, self.encode_one(&items[idx]).await) })
            .buffered(self.encode_concurrency)
            .collect()
            .await;

        let mut documents = Vec::with_capacity(results.len());
        for (idx, result) in results {
            let external_id = items[idx].external_id.as_str();
            match result {
                Ok(document) => documents.push((idx, document)),
                Err(EncodeFailure::Local(err)) => {
                    debug!(external_id, error = %err, "item failed encoding");
                    slots[idx] = Some(DocumentOutcome::local_failure(external_id, local_message(err)));
                }
                Err(EncodeFailure::Lookup(err)) => {
                    warn!(external_id, error = %err, "customer lookup failed");
                    slots[idx] = Some(DocumentOutcome::reference_lookup_failure(
                        external_id,
                        format!("customer lookup failed: {err}"),
                    ));
                }
            }
        }
        documents
    }

    async fn encode_one(&self, item: &InvoiceItem) -> std::result::Result<Document, EncodeFailure> {
        let customer_id = item.customer_id.as_deref().ok_or_else(|| {
            EncodeFailure::Local(TaxBridgeError::LocalValidation("customer_id: is required".into()))
        })?;

        let customer = self
            .directory
            .customer_data(customer_id)
            .await
            .map_err(EncodeFailure::Lookup)?
            .ok_or_else(|| {
                EncodeFailure::Local(TaxBridgeError::LocalValidation(format!(
                    "customer {customer_id} not found"
                )))
            })?;

        let violations = validate_customer(&customer);
        if !violations.is_empty() {
            return Err(EncodeFailure::Local(TaxBridgeError::LocalValidation(describe(&violations))));
        }

        self.codec.encode(item, &customer).map_err(EncodeFailure::Local)
    }

    /// Record immediate rejections; return `(index, uuid)` for accepted
    /// documents that still need polling.
    fn apply_ack(
        &self,
        items: &[InvoiceItem],
        documents: &[(usize, Document)],
        ack: &SubmissionAck,
        slots: &mut [Option<DocumentOutcome>],
    ) -> Vec<(usize, String)> {
        let accepted: HashMap<&str, &str> = ack
            .accepted
            .iter()
            .map(|a| (a.invoice_code_number.as_str(), a.uuid.as_str()))
            .collect();
        let rejected: HashMap<&str, _> =
            ack.rejected.iter().map(|r| (r.invoice_code_number.as_str(), &r.error)).collect();

        let mut pending = Vec::new();
        for (idx, document) in documents {
            let external_id = document.external_id();
            if let Some(error) = rejected.get(external_id) {
                slots[*idx] = Some(DocumentOutcome::rejected(
                    external_id,
                    None,
                    error.code.as_str(),
                    error.full_message(),
                    OutcomeEvidence::Immediate,
                ));
            } else if let Some(uuid) = accepted.get(external_id) {
                pending.push((*idx, (*uuid).to_string()));
            } else {
                warn!(external_id, "document missing from submission acknowledgement");
                slots[*idx] = Some(DocumentOutcome::timed_out(
                    items[*idx].external_id.as_str(),
                    None,
                    OutcomeEvidence::Immediate,
                ));
            }
        }
        pending
    }
}

fn apply_poll(
    items: &[InvoiceItem],
    pending: &[(usize, String)],
    result: &PollResult,
    slots: &mut [Option<DocumentOutcome>],
) {
    for (idx, uuid) in pending {
        let external_id = items[*idx].external_id.as_str();
        slots[*idx] = Some(resolve_document(external_id, uuid, result.summary_for(uuid), result.resolution));
    }
}

/// Map one polled document summary to its outcome.
fn resolve_document(
    external_id: &str,
    uuid: &str,
    summary: Option<&DocumentSummary>,
    resolution: PollResolution,
) -> DocumentOutcome {
    let inferred = match resolution {
        PollResolution::Terminal => OutcomeEvidence::Confirmed,
        PollResolution::Heuristic => OutcomeEvidence::Heuristic,
        PollResolution::Optimistic => OutcomeEvidence::Optimistic,
    };

    let Some(summary) = summary else {
        return DocumentOutcome::timed_out(external_id, Some(uuid.to_string()), inferred);
    };

    match (&summary.status, resolution) {
        (DocumentStatus::Valid, _) => DocumentOutcome::accepted(
            external_id,
            uuid,
            summary.long_id.clone(),
            OutcomeEvidence::Confirmed,
        ),
        (DocumentStatus::Invalid | DocumentStatus::Cancelled, _) => DocumentOutcome::rejected(
            external_id,
            Some(uuid.to_string()),
            summary.status.as_str().to_uppercase(),
            format!("document reported {} by the intake service", summary.status),
            OutcomeEvidence::Confirmed,
        ),
        (DocumentStatus::Submitted, PollResolution::Heuristic | PollResolution::Optimistic) => {
            DocumentOutcome::accepted(external_id, uuid, summary.long_id.clone(), inferred)
        }
        (DocumentStatus::Submitted | DocumentStatus::Unknown(_), _) => {
            DocumentOutcome::timed_out(external_id, Some(uuid.to_string()), inferred)
        }
    }
}

/// Why an item could not be turned into a document.
enum EncodeFailure {
    /// Missing or invalid data; resubmitting unchanged fails again.
    Local(TaxBridgeError),
    /// The customer directory itself failed.
    Lookup(TaxBridgeError),
}

fn local_message(err: TaxBridgeError) -> String {
    match err {
        TaxBridgeError::LocalValidation(message) => message,
        other => other.to_string(),
    }
}

/// Every slot is filled by construction; a gap would be a bookkeeping bug,
/// reported as a timed-out outcome rather than dropped.
fn fill(items: &[InvoiceItem], slots: Vec<Option<DocumentOutcome>>) -> Vec<DocumentOutcome> {
    slots
        .into_iter()
        .zip(items)
        .map(|(slot, item)| {
            slot.unwrap_or_else(|| {
                DocumentOutcome::timed_out(item.external_id.as_str(), None, OutcomeEvidence::Exhausted)
            })
        })
        .collect()
}
