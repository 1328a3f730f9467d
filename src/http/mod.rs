//! HTTP client module with retry logic and error handling.

mod client;
mod retry;
mod transport;

pub use client::HttpClient;
pub use retry::{
    DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT, LOG_BODY_LIMIT, RetryPolicy,
    truncate_for_log,
};
#[cfg(test)]
pub use transport::MockTransport;
pub use transport::{
    AttemptOutcome, HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportErrorKind,
};
