//! Builds a fully-resolved [`PlanRequest`] from loosely-typed input.

use chrono::NaiveDate;
use log::warn;
use serde_json::{Value, json};

use crate::config::PlanConfig;
use crate::error::ErrorReport;

use super::age::{FALLBACK_AGE, age_from_birth_date};
use super::exclusions::{normalize_exclusions, resolve_allowed};
use super::{DemographicInput, PlanRequest};

/// Resolves `input` against the static `config`, as of `today`.
///
/// Only a missing or mistyped structural field (sex, height, weight,
/// fitnessLevel, goal, bodyFocus) or an inverted pair of bounds fails.
/// Optional fields with unusable values are ignored and fall back to
/// configuration, or to [`FALLBACK_AGE`] for `age`. Normalizing the JSON of
/// a `PlanRequest` gives the same `PlanRequest` back.
#[tracing::instrument(skip_all)]
pub fn normalize(
    input: &DemographicInput,
    config: &PlanConfig,
    today: NaiveDate,
) -> Result<PlanRequest, ErrorReport> {
    let sex = required_string(input, "sex")?;
    let height = required_number(input, "height")?;
    let weight = required_number(input, "weight")?;
    let fitness_level = required_string(input, "fitnessLevel")?;
    let goal = required_string(input, "goal")?;
    let body_focus = required_string(input, "bodyFocus")?;

    let age = resolve_age(input, today);

    let (min_workouts, max_workouts) =
        bounds(input, "Workouts", config.min_workouts, config.max_workouts)?;
    let (min_reps, max_reps) = bounds(input, "Reps", config.min_reps, config.max_reps)?;
    let (min_intensity, max_intensity) =
        bounds(input, "Intensity", config.min_intensity, config.max_intensity)?;

    let intensity = optional_count(input, "intensity")
        .unwrap_or(config.default_intensity)
        .clamp(min_intensity, max_intensity);

    let exclude_workouts = normalize_exclusions(input.get("excludeWorkouts"));
    let allowed_workouts = resolve_allowed(&config.workouts, &exclude_workouts);

    Ok(PlanRequest {
        age,
        sex,
        height,
        weight,
        fitness_level,
        goal,
        body_focus,
        intensity,
        exclude_workouts,
        allowed_workouts,
        min_workouts,
        max_workouts,
        min_reps,
        max_reps,
        min_intensity,
        max_intensity,
    })
}

/// `dateOfBirth` wins; an already-derived `age` is kept; otherwise the fallback.
fn resolve_age(input: &DemographicInput, today: NaiveDate) -> u32 {
    match input.get("dateOfBirth") {
        Some(Value::String(raw)) => age_from_birth_date(raw, today),
        Some(Value::Null) | None => optional_count(input, "age").unwrap_or(FALLBACK_AGE),
        Some(_) => FALLBACK_AGE,
    }
}

fn bounds(
    input: &DemographicInput,
    name: &str,
    default_min: u32,
    default_max: u32,
) -> Result<(u32, u32), ErrorReport> {
    let min_key = format!("min{}", name);
    let max_key = format!("max{}", name);
    let min = optional_count(input, &min_key).unwrap_or(default_min);
    let max = optional_count(input, &max_key).unwrap_or(default_max);

    if min > max {
        return Err(ErrorReport::validation(format!(
            "{} ({}) must not exceed {} ({})",
            min_key, min, max_key, max
        ))
        .with_details(json!({ "field": min_key })));
    }
    Ok((min, max))
}

fn missing(field: &str) -> ErrorReport {
    ErrorReport::validation(format!("Missing required field: {}", field))
        .with_details(json!({ "field": field }))
}

fn mistyped(field: &str, expected: &str) -> ErrorReport {
    ErrorReport::validation(format!("Field {} must be a {}", field, expected))
        .with_details(json!({ "field": field, "expected": expected }))
}

fn required_string(input: &DemographicInput, field: &str) -> Result<String, ErrorReport> {
    match input.get(field) {
        None | Some(Value::Null) => Err(missing(field)),
        Some(Value::String(s)) if s.trim().is_empty() => Err(missing(field)),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(_) => Err(mistyped(field, "string")),
    }
}

/// A JSON number, or a string holding one (query-parameter input).
fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn required_number(input: &DemographicInput, field: &str) -> Result<f64, ErrorReport> {
    match input.get(field) {
        None | Some(Value::Null) => Err(missing(field)),
        Some(value) => as_number(value).ok_or_else(|| mistyped(field, "number")),
    }
}

/// A non-negative count, or `None` when absent or unusable.
fn optional_count(input: &DemographicInput, field: &str) -> Option<u32> {
    let value = input.get(field).filter(|v| !v.is_null())?;
    match as_number(value) {
        Some(n) if n >= 0.0 && n <= f64::from(u32::MAX) => Some(n.round() as u32),
        _ => {
            warn!("Ignoring unusable {}: {}", field, value);
            None
        }
    }
}
