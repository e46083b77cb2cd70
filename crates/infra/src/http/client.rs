//! Shared reqwest client for the remote store.
//!
//! Requests that fail at the transport level or come back 5xx are retried
//! with exponential backoff. Every other response goes back to the caller
//! untouched, so a 429 reaches the adapter on the first attempt.

use std::time::Duration;

use partspro_domain::{PartsProError, RemoteStoreError};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response};
use tracing::{debug, warn};

use crate::errors::{remote_error_from_http, InfraError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_ATTEMPTS: usize = 3;
const DEFAULT_BACKOFF: Duration = Duration::from_millis(200);
/// Cap on the backoff exponent (base * 2^8)
const MAX_BACKOFF_DOUBLINGS: u32 = 8;

/// How many times to try a request and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: DEFAULT_ATTEMPTS, backoff: DEFAULT_BACKOFF }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn delay(&self, retry: usize) -> Duration {
        let doublings = (retry.saturating_sub(1) as u32).min(MAX_BACKOFF_DOUBLINGS);
        self.backoff.saturating_mul(1 << doublings)
    }

    fn has_retry_after(&self, attempt: usize) -> bool {
        attempt < self.attempts.max(1)
    }
}

/// Outcome of one attempt, before the retry decision.
enum Attempt {
    Done(Response),
    ServerError(Response),
    Failed(reqwest::Error),
}

#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    pub fn new() -> Result<Self, PartsProError> {
        HttpClientBuilder::default().build()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Start a request on the underlying client.
    pub fn request(&self, method: Method, url: impl reqwest::IntoUrl) -> RequestBuilder {
        self.inner.request(method, url)
    }

    /// Send `request`, retrying connection failures, timeouts and 5xx.
    ///
    /// Once attempts run out the last 5xx response is returned as-is.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteStoreError> {
        let mut attempt = 1;
        loop {
            let outcome = self.attempt(&request, attempt).await?;
            let retryable = match &outcome {
                Attempt::Done(_) => false,
                Attempt::ServerError(_) => true,
                Attempt::Failed(err) => is_transport_failure(err),
            };

            if !retryable || !self.retry.has_retry_after(attempt) {
                return match outcome {
                    Attempt::Done(response) | Attempt::ServerError(response) => Ok(response),
                    Attempt::Failed(err) => Err(remote_error_from_http(&err)),
                };
            }

            let delay = self.retry.delay(attempt);
            warn!(attempt, delay_ms = delay.as_millis() as u64, "Retrying HTTP request");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(
        &self,
        request: &RequestBuilder,
        attempt: usize,
    ) -> Result<Attempt, RemoteStoreError> {
        let request = request
            .try_clone()
            .ok_or_else(|| RemoteStoreError::rejected("streaming request bodies cannot be retried"))?
            .build()
            .map_err(|err| remote_error_from_http(&err))?;

        let (method, url) = (request.method().clone(), request.url().clone());
        match self.inner.execute(request).await {
            Ok(response) if response.status().is_server_error() => {
                debug!(attempt, %method, %url, status = %response.status(), "Server error");
                Ok(Attempt::ServerError(response))
            }
            Ok(response) => {
                debug!(attempt, %method, %url, status = %response.status(), "HTTP response");
                Ok(Attempt::Done(response))
            }
            Err(err) => {
                debug!(attempt, %method, %url, error = %err, "HTTP transport error");
                Ok(Attempt::Failed(err))
            }
        }
    }
}

fn is_transport_failure(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request()
}

/// Builder for [`HttpClient`].
#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    timeout: Option<Duration>,
    retry: RetryPolicy,
    user_agent: Option<String>,
    bearer_token: Option<String>,
}

impl HttpClientBuilder {
    /// Per-request timeout (default 30s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Total tries including the first one.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.retry.attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.retry.backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Attach `Authorization: Bearer <token>` to every request.
    pub fn bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }

    pub fn build(self) -> Result<HttpClient, PartsProError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.bearer_token {
            let mut value = HeaderValue::try_from(format!("Bearer {token}"))
                .map_err(|err| PartsProError::Config(format!("invalid API token: {err}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .default_headers(headers)
            .no_proxy();
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let inner = builder.build().map_err(|err| PartsProError::from(InfraError::from(err)))?;
        Ok(HttpClient { inner, retry: self.retry })
    }
}
