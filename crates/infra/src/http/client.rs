use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response, StatusCode};
use taxbridge_domain::TaxBridgeError;
use tracing::{debug, warn};

use crate::errors::InfraError;

/// HTTP client with timeout and opt-in retry.
///
/// Submissions are not idempotent (the intake service mints a new
/// submission for every POST), so only [`send_idempotent`] retries.
///
/// [`send_idempotent`]: HttpClient::send_idempotent
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    retry: RetryPolicy,
}

/// Backoff for idempotent requests.
///
/// Retries follow [`TaxBridgeError::is_retryable`]: transport failures, 429
/// and 5xx. A numeric `Retry-After` on the response replaces the computed
/// delay; both are capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Initial try plus retries.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    fn delay(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        let doubled = self.base_delay.saturating_mul(1 << retry.saturating_sub(1).min(8));
        retry_after.unwrap_or(doubled).min(self.max_delay)
    }
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the request exactly once.
    pub async fn send_once(&self, builder: RequestBuilder) -> Result<Response, TaxBridgeError> {
        self.execute(builder, 1).await
    }

    /// Execute the request, retrying what [`RetryPolicy`] allows. Only for
    /// idempotent requests.
    pub async fn send_idempotent(&self, builder: RequestBuilder) -> Result<Response, TaxBridgeError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let request = builder.try_clone().ok_or_else(|| {
                TaxBridgeError::Internal("streaming request bodies cannot be retried".into())
            })?;
            let outcome = self.execute(request, attempt).await;
            if attempt >= max_attempts {
                return outcome;
            }

            let delay = match &outcome {
                Ok(response) if retryable_status(response.status()) => {
                    Some(self.retry.delay(attempt, retry_after(response)))
                }
                Err(err) if err.is_retryable() => Some(self.retry.delay(attempt, None)),
                _ => None,
            };
            let Some(delay) = delay else {
                return outcome;
            };

            warn!(attempt, delay_ms = delay.as_millis() as u64, "retrying idempotent request");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn execute(&self, builder: RequestBuilder, attempt: u32) -> Result<Response, TaxBridgeError> {
        let request = builder.build().map_err(|err| TaxBridgeError::from(InfraError::from(err)))?;
        let method = request.method().clone();
        let url = request.url().clone();
        debug!(attempt, %method, %url, "sending HTTP request");

        match self.client.execute(request).await {
            Ok(response) => {
                debug!(attempt, %method, %url, status = %response.status(), "received HTTP response");
                Ok(response)
            }
            Err(err) => {
                debug!(attempt, %method, %url, error = %err, "HTTP request failed");
                Err(InfraError::from(err).into())
            }
        }
    }
}

fn retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// `Retry-After` in delta-seconds form; HTTP dates are ignored.
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    retry: RetryPolicy,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), retry: RetryPolicy::default(), user_agent: None }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total attempts for idempotent requests (minimum 1).
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.retry.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, delay: Duration) -> Self {
        self.retry.base_delay = delay;
        self
    }

    pub fn max_backoff(mut self, delay: Duration) -> Self {
        self.retry.max_delay = delay;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<HttpClient, TaxBridgeError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }
        let client = builder.build().map_err(|err| TaxBridgeError::from(InfraError::from(err)))?;

        Ok(HttpClient { client, retry: self.retry })
    }
}
