//! Client side of the backend: `/plan`, `/quote`, `/image`.

use chrono::NaiveDate;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::config::PlanConfig;
use crate::error::{ErrorReport, ErrorType};
use crate::http::{HttpClient, HttpResponse, truncate_for_log};
use crate::plan::{DemographicInput, normalize};
use crate::provider::{ImageInfo, Quote, WorkoutPlan};

pub struct ApiClient {
    http: HttpClient,
}

impl ApiClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Normalizes `input` locally and asks the backend for a plan.
    ///
    /// Invalid input fails with `validation` before any request is made.
    #[tracing::instrument(skip(self, input, config))]
    pub async fn generate_plan(
        &self,
        input: &DemographicInput,
        config: &PlanConfig,
        today: NaiveDate,
    ) -> Result<WorkoutPlan, ErrorReport> {
        let request = normalize(input, config, today)?;
        debug!(
            "Requesting a plan for age {} with {} allowed workouts",
            request.age,
            request.allowed_workouts.len()
        );
        let response = self.http.post_json("plan", &request).await?;
        into_result(response)
    }

    #[tracing::instrument(skip(self))]
    pub async fn fetch_quote(&self) -> Result<Quote, ErrorReport> {
        into_result(self.http.get("quote").await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn fetch_image(&self) -> Result<ImageInfo, ErrorReport> {
        into_result(self.http.get("image").await?)
    }
}

/// Decodes a backend response, turning error statuses and embedded `error`
/// bodies into an [`ErrorReport`].
pub fn into_result<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ErrorReport> {
    let body: Option<Value> = serde_json::from_str(&response.body).ok();
    let has_error_key = body
        .as_ref()
        .and_then(Value::as_object)
        .is_some_and(|obj| obj.contains_key("error"));

    if !response.is_success() || has_error_key {
        let report = error_from_response(&response, body);
        warn!("Backend answered HTTP {}: {}", response.status, report);
        return Err(report);
    }

    response.json()
}

/// Builds the report for a failed response: the wire report when the body is
/// one, else a report inferred from the status.
pub fn error_from_response(response: &HttpResponse, body: Option<Value>) -> ErrorReport {
    let status = response.status;

    let wire = body
        .clone()
        .and_then(|value| serde_json::from_value::<ErrorReport>(value).ok());
    let report = match wire {
        Some(report) => report,
        None => {
            let error = body
                .as_ref()
                .and_then(|value| value.get("error"))
                .and_then(Value::as_str)
                .filter(|e| !e.trim().is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Request failed with HTTP {}", status));
            ErrorReport::new(ErrorType::from_status(status), error).with_details(json!({
                "status": status,
                "body": truncate_for_log(&response.body),
            }))
        }
    };

    if response.is_success() {
        report
    } else {
        report.with_status(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{classify, is_retryable};
    use crate::http::RetryPolicy;
    use mockito::Matcher;
    use reqwest::Client;
    use std::time::Duration;

    fn client(url: String) -> ApiClient {
        ApiClient::new(
            HttpClient::new(Client::new(), url).with_policy(
                RetryPolicy::default()
                    .with_max_attempts(2)
                    .with_base_delay(Duration::from_millis(10)),
            ),
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 16).unwrap()
    }

    fn input() -> DemographicInput {
        serde_json::from_value(json!({
            "dateOfBirth": "1990-01-01",
            "sex": "female",
            "height": 170,
            "weight": 65,
            "fitnessLevel": "beginner",
            "goal": "build strength",
            "bodyFocus": "full body",
            "excludeWorkouts": ["burpees", " lunges ", "burpees"]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_plan_posts_normalized_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/plan")
            .match_body(Matcher::PartialJson(json!({
                "age": 34,
                "sex": "female",
                "excludeWorkouts": ["burpees", "lunges"],
                "minWorkouts": 3,
                "maxWorkouts": 6
            })))
            .with_status(200)
            .with_body(r#"{"squats": 15, "plank": 30}"#)
            .create_async()
            .await;

        let plan = client(server.url())
            .generate_plan(&input(), &PlanConfig::default(), today())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.reps("squats"), Some(15));
    }

    #[tokio::test]
    async fn test_generate_plan_invalid_input_makes_no_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let mut input = input();
        input.insert("height", json!("tall"));

        let err = client(server.url())
            .generate_plan(&input, &PlanConfig::default(), today())
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.error_type, ErrorType::Validation);
        assert!(!is_retryable(&err));
    }

    #[tokio::test]
    async fn test_wire_error_body_keeps_its_type() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/plan")
            .with_status(429)
            .with_body(
                r#"{"error": "Too many requests", "error_type": "rate_limit", "timestamp": "2024-06-16T10:00:00Z"}"#,
            )
            .create_async()
            .await;

        let err = client(server.url())
            .generate_plan(&input(), &PlanConfig::default(), today())
            .await
            .unwrap_err();

        assert_eq!(err.error_type, ErrorType::RateLimit);
        assert_eq!(err.status_code, Some(429));
        assert_eq!(err.error, "Too many requests");
        assert!(!classify(&err).retryable);
    }

    #[tokio::test]
    async fn test_plain_error_status_is_inferred() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/quote")
            .with_status(503)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let err = client(server.url()).fetch_quote().await.unwrap_err();

        assert_eq!(err.error_type, ErrorType::HttpError);
        assert_eq!(err.status_code, Some(503));
        assert_eq!(err.details.as_ref().unwrap()["body"], "upstream unavailable");
        assert!(is_retryable(&err));
    }

    #[tokio::test]
    async fn test_not_found_is_inferred() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/image")
            .with_status(404)
            .create_async()
            .await;

        let err = client(server.url()).fetch_image().await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::NotFound);
    }

    #[tokio::test]
    async fn test_success_with_embedded_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/quote")
            .with_status(200)
            .with_body(r#"{"error": "quota exhausted"}"#)
            .create_async()
            .await;

        let err = client(server.url()).fetch_quote().await.unwrap_err();

        assert_eq!(err.error, "quota exhausted");
        assert_eq!(err.error_type, ErrorType::HttpError);
        assert_eq!(err.status_code, None);
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/image")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let err = client(server.url()).fetch_image().await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::ParseError);
    }

    #[tokio::test]
    async fn test_quote_and_image_success() {
        let mut server = mockito::Server::new_async().await;
        let _q = server
            .mock("GET", "/quote")
            .with_status(200)
            .with_body(r#"{"quote": "Start where you are.", "author": "Arthur Ashe"}"#)
            .create_async()
            .await;
        let _i = server
            .mock("GET", "/image")
            .with_status(200)
            .with_body(serde_json::to_string(&ImageInfo::fallback()).unwrap())
            .create_async()
            .await;

        let api = client(server.url());
        assert_eq!(api.fetch_quote().await.unwrap().author, "Arthur Ashe");
        assert_eq!(api.fetch_image().await.unwrap(), ImageInfo::fallback());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let err = client("http://127.0.0.1:1".to_string())
            .fetch_quote()
            .await
            .unwrap_err();

        assert_eq!(err.error_type, ErrorType::NetworkError);
        assert_eq!(err.details.as_ref().unwrap()["attempts"], 2);
        assert!(is_retryable(&err));
    }
}
