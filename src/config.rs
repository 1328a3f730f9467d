//! Static plan configuration and provider endpoints.
//!
//! Both are built from defaults and then overridden from the environment
//! through the [`Runtime`], so the same binary can be pointed at a different
//! workout catalog or provider without recompiling.

use anyhow::{Context, Result, bail};
use std::str::FromStr;
use std::time::Duration;

use crate::http::RetryPolicy;
use crate::runtime::{Runtime, optional_var};

/// Workout identifiers offered when no catalog is configured.
pub const DEFAULT_WORKOUTS: &[&str] = &[
    "pushups",
    "squats",
    "lunges",
    "burpees",
    "plank",
    "situps",
    "crunches",
    "jumping_jacks",
    "mountain_climbers",
    "glute_bridges",
    "high_knees",
    "tricep_dips",
];

/// Workout catalog and numeric bounds used to resolve a plan request.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanConfig {
    pub workouts: Vec<String>,
    pub min_workouts: u32,
    pub max_workouts: u32,
    pub min_reps: u32,
    pub max_reps: u32,
    pub min_intensity: u32,
    pub max_intensity: u32,
    pub default_intensity: u32,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            workouts: DEFAULT_WORKOUTS.iter().map(|w| w.to_string()).collect(),
            min_workouts: 3,
            max_workouts: 6,
            min_reps: 5,
            max_reps: 50,
            min_intensity: 1,
            max_intensity: 10,
            default_intensity: 5,
        }
    }
}

impl PlanConfig {
    /// Loads the configuration, letting `FITPLAN_*` variables override defaults.
    pub fn from_runtime<R: Runtime + ?Sized>(runtime: &R) -> Result<Self> {
        let defaults = Self::default();

        let workouts = match optional_var(runtime, "FITPLAN_WORKOUTS") {
            Some(list) => list
                .split(',')
                .map(|w| w.trim().to_string())
                .filter(|w| !w.is_empty())
                .collect(),
            None => defaults.workouts,
        };

        let config = Self {
            workouts,
            min_workouts: env_or(runtime, "FITPLAN_MIN_WORKOUTS", defaults.min_workouts)?,
            max_workouts: env_or(runtime, "FITPLAN_MAX_WORKOUTS", defaults.max_workouts)?,
            min_reps: env_or(runtime, "FITPLAN_MIN_REPS", defaults.min_reps)?,
            max_reps: env_or(runtime, "FITPLAN_MAX_REPS", defaults.max_reps)?,
            min_intensity: env_or(runtime, "FITPLAN_MIN_INTENSITY", defaults.min_intensity)?,
            max_intensity: env_or(runtime, "FITPLAN_MAX_INTENSITY", defaults.max_intensity)?,
            default_intensity: env_or(
                runtime,
                "FITPLAN_DEFAULT_INTENSITY",
                defaults.default_intensity,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workouts.is_empty() {
            bail!("Workout catalog is empty");
        }
        if self.min_workouts > self.max_workouts {
            bail!(
                "min workouts ({}) exceeds max workouts ({})",
                self.min_workouts,
                self.max_workouts
            );
        }
        if self.min_reps > self.max_reps {
            bail!(
                "min reps ({}) exceeds max reps ({})",
                self.min_reps,
                self.max_reps
            );
        }
        if !(self.min_intensity..=self.max_intensity).contains(&self.default_intensity) {
            bail!(
                "default intensity {} is outside {}..={}",
                self.default_intensity,
                self.min_intensity,
                self.max_intensity
            );
        }
        Ok(())
    }
}

pub const DEFAULT_LLM_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_QUOTE_URL: &str = "https://api.api-ninjas.com";
pub const DEFAULT_IMAGE_URL: &str = "https://api.unsplash.com";

/// Where the backend reaches its providers, and how hard it tries.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderEndpoints {
    pub llm_url: String,
    pub llm_model: String,
    pub quote_url: String,
    pub image_url: String,
    pub policy: RetryPolicy,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            llm_url: DEFAULT_LLM_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            quote_url: DEFAULT_QUOTE_URL.to_string(),
            image_url: DEFAULT_IMAGE_URL.to_string(),
            policy: RetryPolicy::default()
                .with_max_attempts(2)
                .with_timeout(Duration::from_secs(20)),
        }
    }
}

impl ProviderEndpoints {
    pub fn from_runtime<R: Runtime + ?Sized>(runtime: &R) -> Self {
        let defaults = Self::default();
        Self {
            llm_url: optional_var(runtime, "OPENAI_API_URL").unwrap_or(defaults.llm_url),
            llm_model: optional_var(runtime, "OPENAI_MODEL").unwrap_or(defaults.llm_model),
            quote_url: optional_var(runtime, "QUOTES_API_URL").unwrap_or(defaults.quote_url),
            image_url: optional_var(runtime, "UNSPLASH_API_URL").unwrap_or(defaults.image_url),
            policy: defaults.policy,
        }
    }
}

fn env_or<R, T>(runtime: &R, key: &str, default: T) -> Result<T>
where
    R: Runtime + ?Sized,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_var(runtime, key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
