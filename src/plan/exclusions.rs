//! Excluded-workout parsing and allowed-workout resolution.

use log::warn;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// The JSON shapes an `excludeWorkouts` value can take.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ExclusionShape<'a> {
    Absent,
    List(&'a [Value]),
    /// Keys name the excluded workouts; values are ignored.
    Keys(&'a Map<String, Value>),
    Single(&'a str),
    Unrecognized(&'a Value),
}

impl<'a> ExclusionShape<'a> {
    fn of(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => ExclusionShape::Absent,
            Some(Value::Array(items)) => ExclusionShape::List(items),
            Some(Value::Object(map)) => ExclusionShape::Keys(map),
            Some(Value::String(s)) => ExclusionShape::Single(s),
            Some(other) => ExclusionShape::Unrecognized(other),
        }
    }

    fn candidates(self) -> Vec<String> {
        match self {
            ExclusionShape::Absent => Vec::new(),
            ExclusionShape::List(items) => items.iter().filter_map(coerce_item).collect(),
            ExclusionShape::Keys(map) => map.keys().cloned().collect(),
            ExclusionShape::Single(s) => vec![s.to_string()],
            ExclusionShape::Unrecognized(value) => {
                warn!(
                    "Ignoring excludeWorkouts of unsupported shape: {}",
                    value
                );
                Vec::new()
            }
        }
    }
}

/// Strings pass through, nulls are dropped, anything else becomes its JSON text.
fn coerce_item(item: &Value) -> Option<String> {
    match item {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Normalizes any `excludeWorkouts` value into trimmed, non-empty, unique
/// names in first-seen order. Never fails.
pub fn normalize_exclusions(value: Option<&Value>) -> Vec<String> {
    let mut seen = HashSet::new();
    ExclusionShape::of(value)
        .candidates()
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Catalog minus the excluded names, in catalog order. May be empty.
pub fn resolve_allowed(catalog: &[String], excluded: &[String]) -> Vec<String> {
    let excluded: HashSet<&str> = excluded.iter().map(String::as_str).collect();
    catalog
        .iter()
        .filter(|workout| !excluded.contains(workout.as_str()))
        .cloned()
        .collect()
}
