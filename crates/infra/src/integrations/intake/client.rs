//! HTTP client for the regulatory intake service
//!
//! Implements the submission gateway over the intake REST API: batch submit,
//! submission status, and raw document retrieval. Every call carries the
//! bearer token supplied by an [`AccessTokenProvider`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use taxbridge_core::SubmissionGateway;
use taxbridge_domain::constants::{DOCUMENTS_PATH, SUBMISSIONS_PATH};
use taxbridge_domain::{
    AcceptedDocument, Document, DocumentStatus, OverallStatus, RejectedDocument, Result,
    SubmissionAck, SubmissionBatch, SubmissionStatus, TaxBridgeError,
};
use tracing::{debug, info, warn};

use super::codec::encode_transport;
use super::errors::IntakeError;
use crate::http::HttpClient;

const REACHABILITY_TIMEOUT_SECS: u64 = 5;

/// Provides bearer tokens for intake calls.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Current valid token, renewing first if needed.
    async fn access_token(&self) -> Result<String>;

    /// Force a fresh issuance regardless of the cached token.
    async fn renew_token(&self) -> Result<String>;
}

/// Intake REST client
pub struct IntakeClient {
    base_url: String,
    http_client: HttpClient,
    access_token_provider: Arc<dyn AccessTokenProvider>,
}

impl IntakeClient {
    /// Create a client with the default request timeout.
    pub fn new(
        base_url: impl Into<String>,
        access_token_provider: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(taxbridge_domain::constants::DEFAULT_REQUEST_TIMEOUT_SECS))
            .max_attempts(3)
            .build()?;
        Ok(Self::with_http_client(base_url, http_client, access_token_provider))
    }

    /// Create a client over a preconfigured [`HttpClient`].
    pub fn with_http_client(
        base_url: impl Into<String>,
        http_client: HttpClient,
        access_token_provider: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http_client, access_token_provider }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Obtain a freshly issued token from the identity service.
    pub async fn issue_token(&self) -> Result<String> {
        self.access_token_provider.renew_token().await
    }

    /// Fetch the stored copy of a submitted document.
    pub async fn get_document_raw(&self, uuid: &str) -> Result<RawDocument> {
        let url = format!("{}{}/{}/raw", self.base_url, DOCUMENTS_PATH, uuid);
        let request = self.authorized(Method::GET, &url).await?;
        let response = self.http_client.send_idempotent(request).await?;
        read_json(response).await
    }

    /// Whether the intake host answers HTTP at all.
    ///
    /// Any HTTP response counts as reachable, including 401 or 404. Returns
    /// the round-trip latency when reachable.
    pub async fn check_reachable(&self) -> Result<Option<Duration>> {
        let probe_client = HttpClient::builder()
            .timeout(Duration::from_secs(REACHABILITY_TIMEOUT_SECS))
            .max_attempts(1)
            .build()?;

        let started = Instant::now();
        let request = probe_client.request(Method::HEAD, &self.base_url);
        match probe_client.send_once(request).await {
            Ok(_) => Ok(Some(started.elapsed())),
            Err(TaxBridgeError::Transport(reason)) => {
                warn!(reason = %reason, "intake service unreachable");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn authorized(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        let token = self.access_token_provider.access_token().await?;
        Ok(self.http_client.request(method, url).bearer_auth(token))
    }
}

#[async_trait]
impl SubmissionGateway for IntakeClient {
    async fn submit_documents(&self, documents: &[Document]) -> Result<SubmissionAck> {
        let url = format!("{}{}", self.base_url, SUBMISSIONS_PATH);
        let body = SubmitRequest { documents: documents.iter().map(WireDocument::from).collect() };

        let request = self.authorized(Method::POST, &url).await?.json(&body);
        let response = self.http_client.send_once(request).await?;
        let parsed: SubmitResponse = read_json(response).await?;

        info!(
            submission_id = %parsed.submission_uid,
            accepted = parsed.accepted_documents.len(),
            rejected = parsed.rejected_documents.len(),
            "submission acknowledged"
        );

        Ok(SubmissionAck {
            batch: SubmissionBatch {
                submission_id: parsed.submission_uid,
                members: documents.iter().map(|d| d.external_id().to_string()).collect(),
                overall_status: OverallStatus::InProgress,
            },
            accepted: parsed.accepted_documents,
            rejected: parsed.rejected_documents,
        })
    }

    async fn submission_status(&self, submission_id: &str) -> Result<SubmissionStatus> {
        let url = format!("{}{}/{}", self.base_url, SUBMISSIONS_PATH, submission_id);
        let request = self.authorized(Method::GET, &url).await?;
        let response = self.http_client.send_idempotent(request).await?;
        let mut status: SubmissionStatus = read_json(response).await?;

        if status.submission_uid.is_empty() {
            status.submission_uid = submission_id.to_string();
        }
        debug!(
            submission_id,
            overall_status = %status.overall_status,
            documents = status.document_summary.len(),
            "submission status received"
        );
        Ok(status)
    }
}

/// Map a response into `T`, or into the classified remote error.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await.map_err(IntakeError::from)?;

    if !status.is_success() {
        let err = IntakeError::from_response(status, &body);
        warn!(status = status.as_u16(), error = %err, "intake request failed");
        return Err(err.into());
    }

    serde_json::from_str(&body).map_err(|e| IntakeError::malformed_success(status, e).into())
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct SubmitRequest {
    documents: Vec<WireDocument>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireDocument {
    format: &'static str,
    document: String,
    document_hash: String,
    code_number: String,
}

impl From<&Document> for WireDocument {
    fn from(doc: &Document) -> Self {
        Self {
            format: doc.format().as_str(),
            document: encode_transport(doc.payload()),
            document_hash: doc.content_hash().to_string(),
            code_number: doc.external_id().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    submission_uid: String,
    #[serde(default)]
    accepted_documents: Vec<AcceptedDocument>,
    #[serde(default)]
    rejected_documents: Vec<RejectedDocument>,
}

/// Stored copy of a document as returned by the raw-document endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDocument {
    pub uuid: String,
    #[serde(default)]
    pub submission_uid: Option<String>,
    #[serde(default)]
    pub internal_id: Option<String>,
    #[serde(default)]
    pub long_id: Option<String>,
    pub status: DocumentStatus,
    /// Document content exactly as submitted.
    pub document: String,
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    struct StaticToken {
        renewals: AtomicUsize,
    }

    #[async_trait]
    impl AccessTokenProvider for StaticToken {
        async fn access_token(&self) -> Result<String> {
            Ok("test-token".to_string())
        }

        async fn renew_token(&self) -> Result<String> {
            let n = self.renewals.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("renewed-{n}"))
        }
    }

    struct NoToken;

    #[async_trait]
    impl AccessTokenProvider for NoToken {
        async fn access_token(&self) -> Result<String> {
            Err(TaxBridgeError::Auth("identity service rejected credentials".into()))
        }

        async fn renew_token(&self) -> Result<String> {
            self.access_token().await
        }
    }

    fn client(server: &MockServer) -> IntakeClient {
        let http = HttpClient::builder().max_attempts(1).build().unwrap();
        IntakeClient::with_http_client(
            server.uri(),
            http,
            Arc::new(StaticToken { renewals: AtomicUsize::new(0) }),
        )
    }

    fn document(id: &str) -> Document {
        Document::new(id, b"{\"a\":1}".to_vec(), "hash-1", taxbridge_domain::DocumentFormat::Json)
    }

    #[tokio::test]
    async fn submit_sends_encoded_documents_with_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SUBMISSIONS_PATH))
            .and(bearer_token("test-token"))
            .and(body_partial_json(serde_json::json!({
                "documents": [{
                    "format": "JSON",
                    "document": "eyJhIjoxfQ==",
                    "documentHash": "hash-1",
                    "codeNumber": "INV-1"
                }]
            })))
            .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
                "submissionUid": "SUB-9",
                "acceptedDocuments": [{"uuid": "U1", "invoiceCodeNumber": "INV-1"}],
                "rejectedDocuments": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ack = client(&server).submit_documents(&[document("INV-1")]).await.unwrap();

        assert_eq!(ack.batch.submission_id, "SUB-9");
        assert_eq!(ack.batch.members, vec!["INV-1".to_string()]);
        assert_eq!(ack.accepted[0].uuid, "U1");
        assert!(ack.rejected.is_empty());
    }

    #[tokio::test]
    async fn rejected_documents_keep_remote_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SUBMISSIONS_PATH))
            .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
                "submissionUid": "SUB-1",
                "acceptedDocuments": [],
                "rejectedDocuments": [{
                    "invoiceCodeNumber": "INV-1",
                    "error": {"code": "BadStructure", "message": "Invalid structure"}
                }]
            })))
            .mount(&server)
            .await;

        let ack = client(&server).submit_documents(&[document("INV-1")]).await.unwrap();

        assert_eq!(ack.rejected[0].error.code, "BadStructure");
        assert_eq!(ack.rejected[0].error.message, "Invalid structure");
    }

    #[tokio::test]
    async fn submit_error_body_becomes_remote_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SUBMISSIONS_PATH))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "error": {"code": "DuplicateSubmission", "message": "Submission already received"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).submit_documents(&[document("INV-1")]).await.unwrap_err();

        assert_eq!(
            err,
            TaxBridgeError::RemoteRejection {
                status: 422,
                code: "DuplicateSubmission".into(),
                message: "Submission already received".into(),
            }
        );
    }

    #[tokio::test]
    async fn non_json_success_is_internal_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{SUBMISSIONS_PATH}/SUB-1")))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = client(&server).submission_status("SUB-1").await.unwrap_err();
        assert!(matches!(err, TaxBridgeError::Internal(_)));
    }

    #[tokio::test]
    async fn status_parses_summary_and_fills_missing_uid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{SUBMISSIONS_PATH}/SUB-1")))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "overallStatus": "in progress",
                "documentSummary": [
                    {"uuid": "U1", "internalId": "INV-1", "status": "Submitted"}
                ],
                "documentCount": 1
            })))
            .mount(&server)
            .await;

        let status = client(&server).submission_status("SUB-1").await.unwrap();

        assert_eq!(status.submission_uid, "SUB-1");
        assert_eq!(status.overall_status, OverallStatus::InProgress);
        assert_eq!(status.document_summary[0].status, DocumentStatus::Submitted);
        assert_eq!(status.document_count, Some(1));
    }

    #[tokio::test]
    async fn unauthorized_status_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server).submission_status("SUB-1").await.unwrap_err();
        assert!(matches!(err, TaxBridgeError::Auth(_)));
    }

    #[tokio::test]
    async fn missing_token_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(202)).expect(0).mount(&server).await;

        let http = HttpClient::builder().max_attempts(1).build().unwrap();
        let client = IntakeClient::with_http_client(server.uri(), http, Arc::new(NoToken));

        let err = client.submit_documents(&[document("INV-1")]).await.unwrap_err();
        assert!(matches!(err, TaxBridgeError::Auth(_)));
    }

    #[tokio::test]
    async fn raw_document_is_fetched_by_uuid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{DOCUMENTS_PATH}/U1/raw")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "uuid": "U1",
                "longId": "LONG-1",
                "status": "Valid",
                "document": "{\"a\":1}"
            })))
            .mount(&server)
            .await;

        let raw = client(&server).get_document_raw("U1").await.unwrap();

        assert_eq!(raw.long_id.as_deref(), Some("LONG-1"));
        assert_eq!(raw.status, DocumentStatus::Valid);
        assert_eq!(raw.document, "{\"a\":1}");
    }

    #[tokio::test]
    async fn issue_token_forces_renewal() {
        let server = MockServer::start().await;
        let client = client(&server);

        assert_eq!(client.issue_token().await.unwrap(), "renewed-1");
        assert_eq!(client.issue_token().await.unwrap(), "renewed-2");
    }

    #[tokio::test]
    async fn reachable_when_host_answers_any_status() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD")).respond_with(ResponseTemplate::new(404)).mount(&server).await;

        assert!(client(&server).check_reachable().await.unwrap().is_some());
    }
}
