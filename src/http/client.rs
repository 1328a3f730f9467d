//! HTTP client with built-in retry logic and error handling.

use log::{debug, warn};
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{ErrorReport, ErrorType};

use super::retry::{RetryPolicy, truncate_for_log};
use super::transport::{AttemptOutcome, HttpRequest, HttpResponse, ReqwestTransport, Transport};

/// HTTP client that retries transport failures and timeouts with linear backoff.
///
/// Only failures to obtain a response are retried. A response with any status
/// code ends the loop and is handed back; deciding whether a 4xx/5xx is an
/// error is up to the caller.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    policy: RetryPolicy,
}

impl HttpClient {
    /// Creates a client over a reqwest Client with the default retry policy.
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self::with_transport(Arc::new(ReqwestTransport::new(client)), base_url)
    }

    pub fn with_transport(transport: Arc<dyn Transport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Resolves an endpoint against the base URL. Absolute URLs pass through.
    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// Performs a GET request.
    pub async fn get(&self, endpoint: &str) -> Result<HttpResponse, ErrorReport> {
        self.execute(&HttpRequest::get(endpoint)).await
    }

    /// Performs a POST request with a JSON body.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<HttpResponse, ErrorReport> {
        let body = serde_json::to_value(body).map_err(|e| {
            ErrorReport::validation("Request body is not serializable").with_message(e.to_string())
        })?;
        self.execute(&HttpRequest::post(endpoint).json(body)).await
    }

    /// Runs up to `max_attempts` attempts, sleeping `(i + 1) * base_delay`
    /// after failed attempt `i` except the last one.
    #[tracing::instrument(skip(self, request), fields(method = %request.method, endpoint = %request.endpoint))]
    pub async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ErrorReport> {
        let policy = self.effective_policy(request);
        policy.validate()?;

        let url = self.url_for(&request.endpoint);
        let mut last_failure = None;

        for attempt in 0..policy.max_attempts {
            let started = Instant::now();
            let outcome = self.transport.send(&url, request, policy.timeout).await;
            let elapsed = started.elapsed();

            match outcome {
                AttemptOutcome::Success(response) => {
                    debug!(
                        "{} {} -> HTTP {} in {:?} (attempt {}/{}): {}",
                        request.method,
                        url,
                        response.status,
                        elapsed,
                        attempt + 1,
                        policy.max_attempts,
                        truncate_for_log(&response.body)
                    );
                    return Ok(response);
                }
                failure => {
                    warn!(
                        "{} {} attempt {}/{} failed after {:?}: {}",
                        request.method,
                        url,
                        attempt + 1,
                        policy.max_attempts,
                        elapsed,
                        describe(&failure)
                    );
                    last_failure = Some(failure);
                }
            }

            if let Some(delay) = policy.backoff_after(attempt) {
                debug!("Retrying {} {} in {:?}...", request.method, url, delay);
                tokio::time::sleep(delay).await;
            }
        }

        let report = exhausted(request, &url, &policy, last_failure.as_ref());
        warn!("{} {} gave up: {}", request.method, url, report);
        Err(report)
    }

    fn effective_policy(&self, request: &HttpRequest) -> RetryPolicy {
        let mut policy = self.policy;
        if let Some(max_attempts) = request.max_attempts {
            policy.max_attempts = max_attempts;
        }
        if let Some(timeout) = request.timeout {
            policy.timeout = timeout;
        }
        policy
    }
}

fn describe(outcome: &AttemptOutcome) -> String {
    match outcome {
        AttemptOutcome::Success(response) => format!("HTTP {}", response.status),
        AttemptOutcome::TransportError { kind, message } => format!("{:?}: {}", kind, message),
        AttemptOutcome::Timeout => "timed out".to_string(),
    }
}

/// Builds the terminal report once every attempt failed.
fn exhausted(
    request: &HttpRequest,
    url: &str,
    policy: &RetryPolicy,
    last_failure: Option<&AttemptOutcome>,
) -> ErrorReport {
    let (error_type, error) = match last_failure {
        Some(AttemptOutcome::Timeout) => (
            ErrorType::Timeout,
            format!("Request timed out after {:?}", policy.timeout),
        ),
        _ => (ErrorType::NetworkError, "Network request failed".to_string()),
    };
    let last_error = last_failure.map(describe).unwrap_or_default();

    ErrorReport::new(error_type, error).with_details(serde_json::json!({
        "method": request.method.as_str(),
        "url": url,
        "attempts": policy.max_attempts,
        "timeoutMs": policy.timeout.as_millis() as u64,
        "lastError": truncate_for_log(&last_error),
    }))
}
