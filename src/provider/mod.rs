//! Provider adapters used by the backend.
//!
//! Each adapter builds the provider-specific request (prompt template, auth
//! header) and extracts the fields the app needs from the provider response.
//! The plan generator reports failures; the quote and image sources never
//! do, they substitute a fallback value instead.

mod image;
mod llm;
mod quote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ErrorReport;
use crate::plan::PlanRequest;

pub use image::{FALLBACK_IMAGE_URL, UnsplashImages};
pub use llm::{OpenAiPlanner, build_prompt, parse_plan};
pub use quote::NinjaQuotes;

/// Workout name to number of reps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkoutPlan(pub BTreeMap<String, u32>);

impl WorkoutPlan {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn reps(&self, workout: &str) -> Option<u32> {
        self.0.get(workout).copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(default)]
    pub quote: String,
    #[serde(default)]
    pub author: String,
}

impl Quote {
    /// What `/quote` answers with when the provider fails.
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfo {
    pub image_url: String,
    pub alt: String,
    pub photographer: String,
    pub photographer_url: String,
}

impl ImageInfo {
    /// What `/image` answers with when the provider fails.
    pub fn fallback() -> Self {
        Self {
            image_url: FALLBACK_IMAGE_URL.to_string(),
            alt: "Person training with a barbell in a gym".to_string(),
            photographer: "Unsplash".to_string(),
            photographer_url: "https://unsplash.com".to_string(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn generate(&self, request: &PlanRequest) -> Result<WorkoutPlan, ErrorReport>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Never fails; an empty quote stands in for provider errors.
    async fn quote(&self) -> Quote;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Never fails; a stock image stands in for provider errors.
    async fn image(&self) -> ImageInfo;
}
