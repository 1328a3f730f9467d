//! Structured failure values shared by the client and the backend.
//!
//! An [`ErrorReport`] is created where a failure becomes terminal (retries
//! exhausted, validation failed, provider answered with garbage) and is passed
//! upward unchanged. It doubles as the wire error body:
//! `{error, error_type, timestamp, message?, details?}`.

mod classify;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub use classify::{Classification, GENERIC_MESSAGE, classify, display_message, is_retryable};

/// Failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    Validation,
    Timeout,
    NetworkError,
    HttpError,
    ParseError,
    RateLimit,
    AuthenticationError,
    ExternalApiError,
    ConfigurationError,
    AiResponseError,
    UnhandledException,
    NotFound,
    /// A wire value outside the taxonomy.
    #[serde(other)]
    Unknown,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Validation => "validation",
            ErrorType::Timeout => "timeout",
            ErrorType::NetworkError => "network_error",
            ErrorType::HttpError => "http_error",
            ErrorType::ParseError => "parse_error",
            ErrorType::RateLimit => "rate_limit",
            ErrorType::AuthenticationError => "authentication_error",
            ErrorType::ExternalApiError => "external_api_error",
            ErrorType::ConfigurationError => "configuration_error",
            ErrorType::AiResponseError => "ai_response_error",
            ErrorType::UnhandledException => "unhandled_exception",
            ErrorType::NotFound => "not_found",
            ErrorType::Unknown => "unknown",
        }
    }

    /// HTTP status the backend answers with for this kind of failure.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorType::Validation => 400,
            ErrorType::AuthenticationError => 401,
            ErrorType::NotFound => 404,
            ErrorType::RateLimit => 429,
            ErrorType::Timeout => 504,
            ErrorType::ConfigurationError | ErrorType::UnhandledException | ErrorType::Unknown => {
                500
            }
            ErrorType::NetworkError
            | ErrorType::HttpError
            | ErrorType::ParseError
            | ErrorType::ExternalApiError
            | ErrorType::AiResponseError => 502,
        }
    }

    /// Best-effort type for a bare HTTP status with no typed error body.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorType::Validation,
            401 | 403 => ErrorType::AuthenticationError,
            404 => ErrorType::NotFound,
            408 => ErrorType::Timeout,
            429 => ErrorType::RateLimit,
            _ => ErrorType::HttpError,
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(Value::String(s.to_lowercase()))
            .ok()
            .filter(|t| *t != ErrorType::Unknown)
            .ok_or_else(|| anyhow::anyhow!("Unknown error type: {}", s))
    }
}

/// Terminal, structured failure value returned to a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{error_type}: {error}")]
pub struct ErrorReport {
    pub error: String,
    pub error_type: ErrorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// HTTP status associated with the failure. Carried by the response line,
    /// never by the body.
    #[serde(default, skip_serializing)]
    pub status_code: Option<u16>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ErrorReport {
    pub fn new(error_type: ErrorType, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            error_type,
            message: None,
            details: None,
            status_code: None,
            timestamp: Utc::now(),
        }
    }

    pub fn validation(error: impl Into<String>) -> Self {
        Self::new(ErrorType::Validation, error)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    /// Status to answer with: the recorded one, else the type's default.
    pub fn http_status(&self) -> u16 {
        self.status_code
            .filter(|s| (400..600).contains(s))
            .unwrap_or_else(|| self.error_type.http_status())
    }
}
