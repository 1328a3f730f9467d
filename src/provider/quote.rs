//! Motivational quotes from an API-Ninjas style quotes endpoint.

use async_trait::async_trait;
use log::warn;
use serde_json::json;

use crate::error::{ErrorReport, ErrorType};
use crate::http::{HttpClient, HttpRequest, truncate_for_log};
use crate::secrets::Credentials;

use super::{Quote, QuoteSource};

pub struct NinjaQuotes {
    http: HttpClient,
    credentials: Credentials,
}

impl NinjaQuotes {
    pub fn new(http: HttpClient, credentials: Credentials) -> Self {
        Self { http, credentials }
    }

    async fn fetch(&self) -> Result<Quote, ErrorReport> {
        let keys = self.credentials.keys().await?;
        let key = keys.quotes.as_deref().ok_or_else(|| {
            ErrorReport::new(ErrorType::ConfigurationError, "Quotes API key is not configured")
        })?;

        let response = self
            .http
            .execute(&HttpRequest::get("v1/quotes").header("X-Api-Key", key))
            .await?;

        if !response.is_success() {
            return Err(ErrorReport::new(
                ErrorType::ExternalApiError,
                format!("Quotes provider returned HTTP {}", response.status),
            )
            .with_details(json!({ "body": truncate_for_log(&response.body) })));
        }

        let quotes: Vec<Quote> = response.json()?;
        quotes
            .into_iter()
            .find(|q| !q.quote.trim().is_empty())
            .ok_or_else(|| ErrorReport::new(ErrorType::ExternalApiError, "Quotes provider returned no quotes"))
    }
}

#[async_trait]
impl QuoteSource for NinjaQuotes {
    #[tracing::instrument(skip(self))]
    async fn quote(&self) -> Quote {
        match self.fetch().await {
            Ok(quote) => quote,
            Err(e) => {
                warn!("Falling back to an empty quote: {}", e);
                Quote::empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RetryPolicy;
    use crate::secrets::ProviderKeys;
    use reqwest::Client;
    use std::time::Duration;

    fn quotes(url: String, key: Option<&str>) -> NinjaQuotes {
        let http = HttpClient::new(Client::new(), url).with_policy(
            RetryPolicy::default()
                .with_max_attempts(2)
                .with_base_delay(Duration::from_millis(10)),
        );
        let credentials = Credentials::fixed(ProviderKeys {
            quotes: key.map(str::to_string),
            ..ProviderKeys::default()
        });
        NinjaQuotes::new(http, credentials)
    }

    #[tokio::test]
    async fn test_quote_success() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/v1/quotes")
            .match_header("x-api-key", "q-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"quote": "Well done is better than well said.", "author": "Benjamin Franklin", "category": "inspirational"}]"#,
            )
            .create_async()
            .await;

        let quote = quotes(server.url(), Some("q-key")).quote().await;

        mock.assert_async().await;
        assert_eq!(quote.author, "Benjamin Franklin");
        assert_eq!(quote.quote, "Well done is better than well said.");
    }

    #[tokio::test]
    async fn test_quote_falls_back_on_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/v1/quotes")
            .with_status(502)
            .create_async()
            .await;

        assert_eq!(quotes(server.url(), Some("q-key")).quote().await, Quote::empty());
    }

    #[tokio::test]
    async fn test_quote_falls_back_on_bad_body() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/v1/quotes")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        assert_eq!(quotes(server.url(), Some("q-key")).quote().await, Quote::empty());
    }

    #[tokio::test]
    async fn test_quote_falls_back_when_unreachable_or_unconfigured() {
        let unreachable = quotes("http://127.0.0.1:1".to_string(), Some("q-key"));
        assert_eq!(unreachable.quote().await, Quote::empty());

        let unconfigured = quotes("http://127.0.0.1:1".to_string(), None);
        assert_eq!(unconfigured.quote().await, Quote::empty());
    }
}
