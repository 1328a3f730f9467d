//! Plan request normalization.
//!
//! A [`DemographicInput`] is whatever the caller sent: a JSON object with
//! loosely-typed fields. [`normalize`] turns it into a [`PlanRequest`], where
//! every field has a concrete value (derived age, resolved workout list,
//! numeric bounds from configuration).

mod age;
mod exclusions;
mod normalize;

use serde::{Deserialize, Serialize};
use serde_json::map::Entry;
use serde_json::{Map, Value};

use crate::error::ErrorReport;

pub use age::{FALLBACK_AGE, age_from_birth_date, age_on, parse_birth_date};
pub use exclusions::{normalize_exclusions, resolve_allowed};
pub use normalize::normalize;

/// Raw caller-provided mapping (dateOfBirth, sex, height, weight,
/// fitnessLevel, goal, bodyFocus, intensity?, excludeWorkouts?, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DemographicInput(Map<String, Value>);

impl DemographicInput {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Builds an input from query-string pairs. Every value is a string; a
    /// key given more than once collects its values into an array.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = Map::new();
        for (key, value) in pairs {
            let value = Value::String(value.into());
            match map.entry(key.into()) {
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
                Entry::Occupied(mut slot) => match slot.get_mut() {
                    Value::Array(values) => values.push(value),
                    first => *first = Value::Array(vec![first.take(), value]),
                },
            }
        }
        Self(map)
    }
}

impl From<Map<String, Value>> for DemographicInput {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for DemographicInput {
    type Error = ErrorReport;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ErrorReport::validation(format!(
                "Plan input must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Fully-resolved payload sent to the backend.
///
/// The raw date of birth is not part of it; `age` is the derived field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub age: u32,
    pub sex: String,
    pub height: f64,
    pub weight: f64,
    pub fitness_level: String,
    pub goal: String,
    pub body_focus: String,
    pub intensity: u32,
    pub exclude_workouts: Vec<String>,
    pub allowed_workouts: Vec<String>,
    pub min_workouts: u32,
    pub max_workouts: u32,
    pub min_reps: u32,
    pub max_reps: u32,
    pub min_intensity: u32,
    pub max_intensity: u32,
}
