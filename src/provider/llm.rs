//! Workout plans from an OpenAI-style chat completions endpoint.

use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::error::{ErrorReport, ErrorType};
use crate::http::{HttpClient, HttpRequest, HttpResponse, truncate_for_log};
use crate::plan::PlanRequest;
use crate::secrets::Credentials;

use super::{PlanGenerator, WorkoutPlan};

const SYSTEM_PROMPT: &str =
    "You are a certified personal trainer. You answer with a single JSON object and nothing else.";

const TEMPERATURE: f64 = 0.7;

pub struct OpenAiPlanner {
    http: HttpClient,
    model: String,
    credentials: Credentials,
}

impl OpenAiPlanner {
    pub fn new(http: HttpClient, model: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            http,
            model: model.into(),
            credentials,
        }
    }
}

#[derive(Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

#[async_trait]
impl PlanGenerator for OpenAiPlanner {
    #[tracing::instrument(skip_all, fields(model = %self.model))]
    async fn generate(&self, request: &PlanRequest) -> Result<WorkoutPlan, ErrorReport> {
        if request.allowed_workouts.is_empty() {
            return Err(ErrorReport::validation("Every workout has been excluded")
                .with_message("Please allow at least one workout type to build a plan."));
        }

        let keys = self.credentials.keys().await?;
        let key = keys.llm.as_deref().ok_or_else(|| {
            ErrorReport::new(ErrorType::ConfigurationError, "LLM API key is not configured")
        })?;

        let body = json!({
            "model": self.model,
            "temperature": TEMPERATURE,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_prompt(request) },
            ],
        });

        let response = self
            .http
            .execute(
                &HttpRequest::post("chat/completions")
                    .header("Authorization", format!("Bearer {}", key))
                    .json(body),
            )
            .await?;

        check_status(&response)?;

        let completion: Completion = serde_json::from_str(&response.body).map_err(|e| {
            ErrorReport::new(ErrorType::AiResponseError, "Malformed completion from AI provider")
                .with_details(json!({
                    "reason": e.to_string(),
                    "body": truncate_for_log(&response.body),
                }))
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ErrorReport::new(ErrorType::AiResponseError, "AI provider returned no content")
            })?;

        debug!("AI plan content: {}", truncate_for_log(&content));
        parse_plan(&content, request)
    }
}

fn check_status(response: &HttpResponse) -> Result<(), ErrorReport> {
    if response.is_success() {
        return Ok(());
    }

    let error_type = match response.status {
        401 | 403 => ErrorType::AuthenticationError,
        429 => ErrorType::RateLimit,
        _ => ErrorType::ExternalApiError,
    };
    warn!(
        "AI provider answered HTTP {}: {}",
        response.status,
        truncate_for_log(&response.body)
    );

    Err(
        ErrorReport::new(error_type, format!("AI provider returned HTTP {}", response.status))
            .with_details(json!({
                "providerStatus": response.status,
                "body": truncate_for_log(&response.body),
            })),
    )
}

/// The user prompt for a plan request.
pub fn build_prompt(request: &PlanRequest) -> String {
    format!(
        "Create a bodyweight workout plan for a {age}-year-old {sex}, {height} cm tall and weighing {weight} kg.\n\
         Fitness level: {level}. Goal: {goal}. Body focus: {focus}.\n\
         Intensity: {intensity} on a scale from {min_intensity} to {max_intensity}.\n\
         Choose between {min_workouts} and {max_workouts} workouts, using only these identifiers: {allowed}.\n\
         Give each workout between {min_reps} and {max_reps} reps.\n\
         Respond with only a JSON object mapping each workout identifier to its number of reps, for example {{\"{example}\": 12}}.",
        age = request.age,
        sex = request.sex,
        height = request.height,
        weight = request.weight,
        level = request.fitness_level,
        goal = request.goal,
        focus = request.body_focus,
        intensity = request.intensity,
        min_intensity = request.min_intensity,
        max_intensity = request.max_intensity,
        min_workouts = request.min_workouts,
        max_workouts = request.max_workouts,
        allowed = request.allowed_workouts.join(", "),
        min_reps = request.min_reps,
        max_reps = request.max_reps,
        example = request
            .allowed_workouts
            .first()
            .map(String::as_str)
            .unwrap_or("pushups"),
    )
}

/// Extracts a plan from model output.
///
/// Markdown code fences and surrounding prose are tolerated. Workouts outside
/// the allowed list and non-numeric reps are dropped, reps are clamped into the
/// request's bounds, and the first `max_workouts` entries in the model's order
/// are kept.
pub fn parse_plan(content: &str, request: &PlanRequest) -> Result<WorkoutPlan, ErrorReport> {
    let object = extract_object(content).ok_or_else(|| {
        ErrorReport::new(ErrorType::AiResponseError, "AI response is not a JSON object")
            .with_details(json!({ "content": truncate_for_log(content) }))
    })?;

    let mut plan = WorkoutPlan::default();
    for (name, value) in object {
        let name = name.trim();
        if !request.allowed_workouts.iter().any(|w| w == name) {
            debug!("Dropping workout outside the allowed list: {}", name);
            continue;
        }
        let Some(reps) = reps_of(&value) else {
            debug!("Dropping {} with non-numeric reps: {}", name, value);
            continue;
        };
        if plan.len() >= request.max_workouts as usize {
            break;
        }
        let reps = (reps.round().max(0.0) as u32).clamp(request.min_reps, request.max_reps);
        plan.0.insert(name.to_string(), reps);
    }

    if plan.is_empty() {
        return Err(
            ErrorReport::new(ErrorType::AiResponseError, "AI response contained no usable workouts")
                .with_details(json!({ "content": truncate_for_log(content) })),
        );
    }
    Ok(plan)
}

fn extract_object(content: &str) -> Option<Map<String, Value>> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&content[start..=end]).ok()
}

fn reps_of(value: &Value) -> Option<f64> {
    let reps: Option<f64> = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    reps.filter(|n| n.is_finite())
}
