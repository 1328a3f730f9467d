use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;
use std::time::Duration;

use crate::api::ApiClient;
use crate::http::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT, HttpClient, RetryPolicy};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8888";

/// How the CLI reaches the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    pub api_url: String,
    pub attempts: u32,
    pub timeout: Duration,
    pub base_delay: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            attempts: DEFAULT_MAX_ATTEMPTS,
            timeout: DEFAULT_TIMEOUT,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl ClientOptions {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.attempts)
            .with_timeout(self.timeout)
            .with_base_delay(self.base_delay)
    }

    pub fn api_client(&self) -> Result<ApiClient> {
        debug!("Using backend at {} with {:?}", self.api_url, self.policy());
        let http = HttpClient::new(http_client()?, self.api_url.clone()).with_policy(self.policy());
        Ok(ApiClient::new(http))
    }
}

/// The reqwest client shared by the CLI and the backend's provider adapters.
pub fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(concat!("fitplan/", env!("FITPLAN_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}
