use super::handlers::Route;
use super::*;
use crate::http::RetryPolicy;
use crate::provider::{
    ImageInfo, MockImageSource, MockPlanGenerator, MockQuoteSource, Quote, WorkoutPlan,
};
use crate::runtime::MockRuntime;
use crate::secrets::ProviderKeys;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use chrono::NaiveDate;
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

fn runtime() -> Arc<dyn Runtime> {
    let mut runtime = MockRuntime::new();
    runtime
        .expect_today()
        .returning(|| NaiveDate::from_ymd_opt(2024, 6, 16).unwrap());
    Arc::new(runtime)
}

fn quiet_quotes() -> MockQuoteSource {
    let mut quotes = MockQuoteSource::new();
    quotes.expect_quote().never();
    quotes
}

fn quiet_images() -> MockImageSource {
    let mut images = MockImageSource::new();
    images.expect_image().never();
    images
}

fn state(
    planner: MockPlanGenerator,
    quotes: MockQuoteSource,
    images: MockImageSource,
) -> AppState {
    AppState {
        planner: Arc::new(planner),
        quotes: Arc::new(quotes),
        images: Arc::new(images),
        plan_config: Arc::new(PlanConfig::default()),
        runtime: runtime(),
    }
}

fn idle_planner() -> MockPlanGenerator {
    let mut planner = MockPlanGenerator::new();
    planner.expect_generate().never();
    planner
}

async fn send(
    router: Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, axum::http::HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = router
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, value)
}

fn plan_input() -> Value {
    json!({
        "age": 31,
        "sex": "male",
        "height": 180,
        "weight": 82,
        "fitnessLevel": "intermediate",
        "goal": "lose weight",
        "bodyFocus": "core",
        "excludeWorkouts": ["burpees"]
    })
}

#[test]
fn test_route_from_path() {
    assert_eq!(Route::from_path("/plan"), Some(Route::Plan));
    assert_eq!(
        Route::from_path("/.netlify/functions/api/quote"),
        Some(Route::Quote)
    );
    assert_eq!(Route::from_path("/api/image/today"), Some(Route::Image));
    assert_eq!(Route::from_path("/health"), None);
}

#[tokio::test]
async fn test_options_short_circuits_with_cors() {
    let router = build_router(state(idle_planner(), quiet_quotes(), quiet_images()));

    let (status, headers, body) = send(router, Method::OPTIONS, "/anything", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "GET, POST, OPTIONS");
    assert!(headers.contains_key("access-control-allow-headers"));
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let router = build_router(state(idle_planner(), quiet_quotes(), quiet_images()));

    let (status, headers, body) = send(router, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_type"], "not_found");
    assert!(body.get("timestamp").is_some());
    assert_eq!(headers["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn test_quote_and_image_pass_through() {
    let mut quotes = MockQuoteSource::new();
    quotes.expect_quote().times(1).returning(|| Quote {
        quote: "Keep going".to_string(),
        author: "Coach".to_string(),
    });
    let mut images = MockImageSource::new();
    images.expect_image().times(1).returning(ImageInfo::fallback);

    let router = build_router(state(idle_planner(), quotes, images));

    let (status, _, body) = send(router.clone(), Method::GET, "/api/quote", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"quote": "Keep going", "author": "Coach"}));

    let (status, _, body) = send(router, Method::GET, "/api/image", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["imageUrl"], crate::provider::FALLBACK_IMAGE_URL);
}

#[tokio::test]
async fn test_quote_and_image_fallback_when_providers_unreachable() {
    let endpoints = ProviderEndpoints {
        llm_url: "http://127.0.0.1:1".to_string(),
        llm_model: "gpt-test".to_string(),
        quote_url: "http://127.0.0.1:1".to_string(),
        image_url: "http://127.0.0.1:1".to_string(),
        policy: RetryPolicy::default()
            .with_max_attempts(2)
            .with_base_delay(Duration::from_millis(10)),
    };
    let credentials = Credentials::fixed(ProviderKeys {
        llm: Some("sk".to_string()),
        quotes: Some("q".to_string()),
        images: Some("i".to_string()),
    });
    let state = AppState::from_endpoints(
        reqwest::Client::new(),
        &endpoints,
        credentials,
        PlanConfig::default(),
        runtime(),
    );
    let router = build_router(state);

    let (status, _, body) = send(router.clone(), Method::GET, "/quote", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"quote": "", "author": ""}));

    let (status, _, body) = send(router.clone(), Method::GET, "/image", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::to_value(ImageInfo::fallback()).unwrap());

    // The plan endpoint is the one that surfaces provider failure
    let (status, _, body) = send(router, Method::POST, "/plan", Some(plan_input())).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error_type"], "network_error");
}

#[tokio::test]
async fn test_plan_post_normalizes_and_generates() {
    let mut planner = MockPlanGenerator::new();
    planner
        .expect_generate()
        .times(1)
        .withf(|request| {
            request.age == 31
                && request.intensity == 5
                && !request.allowed_workouts.contains(&"burpees".to_string())
        })
        .returning(|_| Ok(WorkoutPlan([("plank".to_string(), 20)].into_iter().collect())));

    let router = build_router(state(planner, quiet_quotes(), quiet_images()));
    let (status, _, body) = send(router, Method::POST, "/plan", Some(plan_input())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"plank": 20}));
}

#[tokio::test]
async fn test_plan_get_with_query_params() {
    let mut planner = MockPlanGenerator::new();
    planner
        .expect_generate()
        .times(1)
        .withf(|request| {
            request.age == 23 && request.height == 165.0 && request.exclude_workouts == ["plank"]
        })
        .returning(|_| Ok(WorkoutPlan([("squats".to_string(), 12)].into_iter().collect())));

    let router = build_router(state(planner, quiet_quotes(), quiet_images()));
    let uri = "/plan?dateOfBirth=2000-06-17&sex=female&height=165&weight=58\
               &fitnessLevel=beginner&goal=tone&bodyFocus=legs&excludeWorkouts=plank";
    let (status, _, body) = send(router, Method::GET, uri, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["squats"], 12);
}

#[tokio::test]
async fn test_plan_get_with_repeated_exclusions() {
    let mut planner = MockPlanGenerator::new();
    planner
        .expect_generate()
        .times(1)
        .withf(|request| {
            request.exclude_workouts == ["plank", "burpees"]
                && !request.allowed_workouts.iter().any(|w| w == "plank" || w == "burpees")
        })
        .returning(|_| Ok(WorkoutPlan([("squats".to_string(), 12)].into_iter().collect())));

    let router = build_router(state(planner, quiet_quotes(), quiet_images()));
    let uri = "/plan?age=30&sex=female&height=165&weight=58&fitnessLevel=beginner\
               &goal=tone&bodyFocus=legs&excludeWorkouts=plank&excludeWorkouts=burpees";
    let (status, _, _) = send(router, Method::GET, uri, None).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_plan_validation_error() {
    let mut input = plan_input();
    input.as_object_mut().unwrap().remove("goal");

    let router = build_router(state(idle_planner(), quiet_quotes(), quiet_images()));
    let (status, _, body) = send(router, Method::POST, "/plan", Some(input)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "validation");
    assert_eq!(body["details"]["field"], "goal");
}

#[tokio::test]
async fn test_plan_rejects_non_object_body() {
    let router = build_router(state(idle_planner(), quiet_quotes(), quiet_images()));

    let (status, _, body) = send(router.clone(), Method::POST, "/plan", Some(json!([1, 2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], "validation");

    let response = router
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/plan")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_plan_propagates_provider_error() {
    let mut planner = MockPlanGenerator::new();
    planner.expect_generate().times(1).returning(|_| {
        Err(ErrorReport::new(
            ErrorType::AiResponseError,
            "AI response is not a JSON object",
        ))
    });

    let router = build_router(state(planner, quiet_quotes(), quiet_images()));
    let (status, headers, body) = send(router, Method::POST, "/plan", Some(plan_input())).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error_type"], "ai_response_error");
    assert_eq!(body["error"], "AI response is not a JSON object");
    assert_eq!(headers["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn test_wrong_method_is_rejected() {
    let router = build_router(state(idle_planner(), quiet_quotes(), quiet_images()));
    let (status, _, body) = send(router, Method::DELETE, "/quote", None).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error_type"], "http_error");
}

#[tokio::test]
async fn test_panicking_handler_becomes_unhandled_exception() {
    struct ExplodingQuotes;

    #[async_trait::async_trait]
    impl QuoteSource for ExplodingQuotes {
        async fn quote(&self) -> Quote {
            panic!("quote source exploded")
        }
    }

    let mut state = state(idle_planner(), quiet_quotes(), quiet_images());
    state.quotes = Arc::new(ExplodingQuotes);
    let router = build_router(state);
    let (status, headers, body) = send(router, Method::GET, "/quote", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error_type"], "unhandled_exception");
    assert_eq!(headers["access-control-allow-origin"], "*");
}
