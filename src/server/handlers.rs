//! Request dispatch and the three endpoint handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use log::{debug, warn};
use serde_json::Value;

use crate::error::{ErrorReport, ErrorType};
use crate::http::truncate_for_log;
use crate::plan::{DemographicInput, normalize};

use super::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Route {
    Plan,
    Quote,
    Image,
}

impl Route {
    /// Substring match on the request path.
    pub(super) fn from_path(path: &str) -> Option<Self> {
        if path.contains("/plan") {
            Some(Route::Plan)
        } else if path.contains("/quote") {
            Some(Route::Quote)
        } else if path.contains("/image") {
            Some(Route::Image)
        } else {
            None
        }
    }
}

pub(super) async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    Query(query): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    let Some(route) = Route::from_path(uri.path()) else {
        debug!("No route for {} {}", method, uri.path());
        return ErrorReport::new(ErrorType::NotFound, format!("No route for {}", uri.path()))
            .into_response();
    };

    match (route, method) {
        (Route::Plan, Method::POST) => plan_from_body(&state, &body).await,
        (Route::Plan, Method::GET) => plan(&state, DemographicInput::from_pairs(query)).await,
        (Route::Quote, Method::GET) => Json(state.quotes.quote().await).into_response(),
        (Route::Image, Method::GET) => Json(state.images.image().await).into_response(),
        (route, method) => ErrorReport::new(
            ErrorType::HttpError,
            format!("Method {} is not allowed for {:?}", method, route),
        )
        .with_status(StatusCode::METHOD_NOT_ALLOWED.as_u16())
        .into_response(),
    }
}

async fn plan_from_body(state: &AppState, body: &[u8]) -> Response {
    let parsed: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            warn!(
                "Rejecting /plan body that is not JSON ({}): {}",
                e,
                truncate_for_log(&String::from_utf8_lossy(body))
            );
            return ErrorReport::validation("Request body must be a JSON object")
                .with_message(e.to_string())
                .into_response();
        }
    };

    match DemographicInput::try_from(parsed) {
        Ok(input) => plan(state, input).await,
        Err(report) => report.into_response(),
    }
}

async fn plan(state: &AppState, input: DemographicInput) -> Response {
    let request = match normalize(&input, &state.plan_config, state.runtime.today()) {
        Ok(request) => request,
        Err(report) => {
            debug!("Invalid plan input: {}", report);
            return report.into_response();
        }
    };

    match state.planner.generate(&request).await {
        Ok(plan) => Json(plan).into_response(),
        Err(report) => {
            warn!("Plan generation failed: {}", report);
            report.into_response()
        }
    }
}
