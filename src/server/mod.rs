//! Backend HTTP surface: `/plan`, `/quote`, `/image`.
//!
//! Routing is a single fallback handler matching the path by substring, so
//! the service answers the same behind any function prefix
//! (`/.netlify/functions/api/plan` and `/plan` both reach the plan handler).

mod handlers;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::{PlanConfig, ProviderEndpoints};
use crate::error::{ErrorReport, ErrorType};
use crate::http::HttpClient;
use crate::provider::{
    ImageSource, NinjaQuotes, OpenAiPlanner, PlanGenerator, QuoteSource, UnsplashImages,
};
use crate::runtime::Runtime;
use crate::secrets::Credentials;

/// Shared state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<dyn PlanGenerator>,
    pub quotes: Arc<dyn QuoteSource>,
    pub images: Arc<dyn ImageSource>,
    pub plan_config: Arc<PlanConfig>,
    pub runtime: Arc<dyn Runtime>,
}

impl AppState {
    /// Wires the real provider adapters.
    pub fn from_endpoints(
        client: reqwest::Client,
        endpoints: &ProviderEndpoints,
        credentials: Credentials,
        plan_config: PlanConfig,
        runtime: Arc<dyn Runtime>,
    ) -> Self {
        let http = |url: &str| HttpClient::new(client.clone(), url).with_policy(endpoints.policy);

        Self {
            planner: Arc::new(OpenAiPlanner::new(
                http(&endpoints.llm_url),
                endpoints.llm_model.clone(),
                credentials.clone(),
            )),
            quotes: Arc::new(NinjaQuotes::new(http(&endpoints.quote_url), credentials.clone())),
            images: Arc::new(UnsplashImages::new(http(&endpoints.image_url), credentials)),
            plan_config: Arc::new(plan_config),
            runtime,
        }
    }
}

/// Builds the router with permissive CORS headers on every response.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback(handlers::dispatch)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the router until the process is stopped.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(state))
        .await
        .context("Server terminated unexpectedly")
}

fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| err.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());
    log::error!("Handler panicked: {}", detail);

    ErrorReport::new(ErrorType::UnhandledException, "Internal server error").into_response()
}

impl IntoResponse for ErrorReport {
    fn into_response(self) -> Response {
        let status = axum::http::StatusCode::from_u16(self.http_status())
            .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        (status, axum::Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests;
