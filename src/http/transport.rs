//! A single network attempt and its outcome.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{ErrorReport, ErrorType};

use super::retry::truncate_for_log;

/// A request as the client sees it: path or absolute URL plus optional
/// overrides of the client's retry policy.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub endpoint: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    /// JSON body, only sent with POST.
    pub body: Option<Value>,
    pub timeout: Option<Duration>,
    pub max_attempts: Option<u32>,
}

impl HttpRequest {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            timeout: None,
            max_attempts: None,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::POST, endpoint)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

/// A received response. Any status code counts as a response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are lowercase.
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Deserializes the body, reporting failures as `parse_error`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ErrorReport> {
        serde_json::from_str(&self.body).map_err(|e| {
            ErrorReport::new(ErrorType::ParseError, "Failed to parse JSON response")
                .with_status(self.status)
                .with_details(serde_json::json!({
                    "reason": e.to_string(),
                    "body": truncate_for_log(&self.body),
                }))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The connection could not be established.
    Connect,
    /// The request failed after connecting.
    Request,
    /// The response body could not be read.
    Body,
}

/// Result of one attempt. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success(HttpResponse),
    TransportError {
        kind: TransportErrorKind,
        message: String,
    },
    Timeout,
}

/// Performs exactly one attempt of a request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, url: &str, request: &HttpRequest, timeout: Duration) -> AttemptOutcome;
}

/// [`Transport`] backed by a reqwest [`Client`].
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[tracing::instrument(skip(self, request))]
    async fn send(&self, url: &str, request: &HttpRequest, timeout: Duration) -> AttemptOutcome {
        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .timeout(timeout);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if request.method == Method::POST
            && let Some(body) = &request.body
        {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return failed_attempt(&e, TransportErrorKind::Request),
        };

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        match response.text().await {
            Ok(body) => AttemptOutcome::Success(HttpResponse {
                status,
                headers,
                body,
            }),
            Err(e) => {
                debug!("Failed to read body of HTTP {} response: {}", status, e);
                failed_attempt(&e, TransportErrorKind::Body)
            }
        }
    }
}

fn failed_attempt(error: &reqwest::Error, fallback: TransportErrorKind) -> AttemptOutcome {
    if error.is_timeout() {
        return AttemptOutcome::Timeout;
    }

    let kind = if error.is_connect() {
        TransportErrorKind::Connect
    } else {
        fallback
    };

    AttemptOutcome::TransportError {
        kind,
        message: error.to_string(),
    }
}
