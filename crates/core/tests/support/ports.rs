//! In-memory port implementations

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use taxbridge_core::{CustomerDirectory, DocumentCodec, SubmissionGateway};
use taxbridge_domain::{
    AcceptedDocument, CustomerData, Document, DocumentFormat, DocumentStatus, DocumentSummary,
    InvoiceItem, OverallStatus, RejectedDocument, RemoteErrorDetail, Result, SubmissionAck,
    SubmissionBatch, SubmissionStatus, TaxBridgeError,
};

/// Customer lookup backed by a map; counts lookups.
#[derive(Default, Clone)]
pub struct MockDirectory {
    customers: Arc<HashMap<String, CustomerData>>,
    lookups: Arc<AtomicUsize>,
    error: Option<TaxBridgeError>,
}

impl MockDirectory {
    pub fn new(customers: Vec<CustomerData>) -> Self {
        Self {
            customers: Arc::new(customers.into_iter().map(|c| (c.customer_id.clone(), c)).collect()),
            lookups: Arc::new(AtomicUsize::new(0)),
            error: None,
        }
    }

    /// Every lookup fails with `error`.
    pub fn failing(error: TaxBridgeError) -> Self {
        Self { error: Some(error), ..Self::default() }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CustomerDirectory for MockDirectory {
    async fn customer_data(&self, customer_id: &str) -> Result<Option<CustomerData>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        Ok(self.customers.get(customer_id).cloned())
    }
}

/// Codec producing `{external_id}:{customer tin}` payloads.
#[derive(Default)]
pub struct StubCodec {
    pub fail_for: Vec<String>,
}

impl DocumentCodec for StubCodec {
    fn encode(&self, item: &InvoiceItem, customer: &CustomerData) -> Result<Document> {
        if self.fail_for.contains(&item.external_id) {
            return Err(TaxBridgeError::LocalValidation(format!(
                "{}: mandatory field missing",
                item.external_id
            )));
        }
        let payload = format!("{}:{}", item.external_id, customer.tin.as_deref().unwrap_or_default());
        Ok(Document::new(
            item.external_id.as_str(),
            payload.into_bytes(),
            format!("hash-{}", item.external_id),
            DocumentFormat::Json,
        ))
    }
}

/// Gateway that accepts every document except those listed in `reject`,
/// then replays scripted status responses (repeating the last one).
pub struct MockGateway {
    reject: Vec<String>,
    statuses: Mutex<VecDeque<SubmissionStatus>>,
    last_status: Mutex<Option<SubmissionStatus>>,
    submit_error: Option<TaxBridgeError>,
    status_error: Option<TaxBridgeError>,
    pub submitted: Mutex<Vec<Vec<String>>>,
    status_calls: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            reject: Vec::new(),
            statuses: Mutex::new(VecDeque::new()),
            last_status: Mutex::new(None),
            submit_error: None,
            status_error: None,
            submitted: Mutex::new(Vec::new()),
            status_calls: AtomicUsize::new(0),
        }
    }

    pub fn rejecting(mut self, external_id: &str) -> Self {
        self.reject.push(external_id.to_string());
        self
    }

    pub fn with_status(self, status: SubmissionStatus) -> Self {
        self.statuses.lock().push_back(status);
        self
    }

    pub fn failing_submit(mut self, error: TaxBridgeError) -> Self {
        self.submit_error = Some(error);
        self
    }

    pub fn failing_status(mut self, error: TaxBridgeError) -> Self {
        self.status_error = Some(error);
        self
    }

    pub fn submit_calls(&self) -> usize {
        self.submitted.lock().len()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

/// Remote UUID assigned to an external id.
pub fn uuid_for(external_id: &str) -> String {
    format!("uuid-{external_id}")
}

pub fn doc_summary(external_id: &str, status: DocumentStatus) -> DocumentSummary {
    DocumentSummary {
        uuid: uuid_for(external_id),
        submission_uid: Some("SUB-1".to_string()),
        internal_id: Some(external_id.to_string()),
        long_id: matches!(status, DocumentStatus::Valid).then(|| format!("LONG-{external_id}")),
        status,
    }
}

pub fn submission_status(overall: OverallStatus, summary: Vec<DocumentSummary>) -> SubmissionStatus {
    SubmissionStatus {
        submission_uid: "SUB-1".to_string(),
        overall_status: overall,
        document_count: Some(summary.len() as u32),
        document_summary: summary,
        date_time_received: Some("2026-03-01T10:00:00Z".to_string()),
    }
}

#[async_trait]
impl SubmissionGateway for MockGateway {
    async fn submit_documents(&self, documents: &[Document]) -> Result<SubmissionAck> {
        self.submitted
            .lock()
            .push(documents.iter().map(|d| d.external_id().to_string()).collect());
        if let Some(err) = &self.submit_error {
            return Err(err.clone());
        }

        let (rejected, accepted): (Vec<&Document>, Vec<&Document>) =
            documents.iter().partition(|d| self.reject.iter().any(|r| r == d.external_id()));

        Ok(SubmissionAck {
            batch: SubmissionBatch {
                submission_id: "SUB-1".to_string(),
                members: documents.iter().map(|d| d.external_id().to_string()).collect(),
                overall_status: OverallStatus::InProgress,
            },
            accepted: accepted
                .into_iter()
                .map(|d| AcceptedDocument {
                    uuid: uuid_for(d.external_id()),
                    invoice_code_number: d.external_id().to_string(),
                })
                .collect(),
            rejected: rejected
                .into_iter()
                .map(|d| RejectedDocument {
                    invoice_code_number: d.external_id().to_string(),
                    error: RemoteErrorDetail {
                        code: "BadStructure".to_string(),
                        message: "Document format is invalid".to_string(),
                        target: Some(d.external_id().to_string()),
                        details: Vec::new(),
                    },
                })
                .collect(),
        })
    }

    async fn submission_status(&self, _submission_id: &str) -> Result<SubmissionStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.status_error {
            return Err(err.clone());
        }
        let next = self.statuses.lock().pop_front();
        if let Some(status) = next {
            *self.last_status.lock() = Some(status.clone());
            return Ok(status);
        }
        self.last_status
            .lock()
            .clone()
            .ok_or_else(|| TaxBridgeError::Transport("no status scripted".to_string()))
    }
}
