use anyhow::{Context, Result};
use log::info;
use serde_json::Value;
use std::io::Read;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use crate::config::{PlanConfig, ProviderEndpoints};
use crate::error::{ErrorReport, classify};
use crate::plan::DemographicInput;
use crate::provider::{ImageInfo, Quote, WorkoutPlan};
use crate::runtime::Runtime;
use crate::secrets::{Credentials, EnvSecretSource, process_cache};
use crate::server::{self, AppState};

pub mod config;

pub use config::{ClientOptions, DEFAULT_API_URL, http_client};

pub const DEFAULT_BIND: &str = "127.0.0.1:8888";

const RETRY_HINT: &str = "This looks temporary. Please try again in a moment.";

/// Runs the backend until the process is stopped.
#[tracing::instrument(skip(runtime))]
pub async fn serve<R: Runtime + Clone + 'static>(runtime: R, bind: SocketAddr) -> Result<()> {
    let plan_config = PlanConfig::from_runtime(&runtime).context("Invalid plan configuration")?;
    let endpoints = ProviderEndpoints::from_runtime(&runtime);
    info!(
        "Serving {} workouts; LLM model {} at {}",
        plan_config.workouts.len(),
        endpoints.llm_model,
        endpoints.llm_url
    );

    let credentials = Credentials::new(
        process_cache(),
        Arc::new(EnvSecretSource::new(runtime.clone())),
    );
    let state = AppState::from_endpoints(
        http_client()?,
        &endpoints,
        credentials,
        plan_config,
        Arc::new(runtime),
    );
    server::serve(bind, state).await
}

/// Normalizes the demographic JSON at `input` (`-` for stdin) and prints the
/// plan the backend generates for it.
#[tracing::instrument(skip(runtime, options))]
pub async fn plan<R: Runtime>(runtime: &R, options: &ClientOptions, input: &Path) -> Result<()> {
    let demographics = read_input(input)?;
    let plan_config = PlanConfig::from_runtime(runtime).context("Invalid plan configuration")?;

    let plan = options
        .api_client()?
        .generate_plan(&demographics, &plan_config, runtime.today())
        .await?;
    print_plan(&plan);
    Ok(())
}

#[tracing::instrument(skip(options))]
pub async fn quote(options: &ClientOptions) -> Result<()> {
    let quote = options.api_client()?.fetch_quote().await?;
    print_quote(&quote);
    Ok(())
}

#[tracing::instrument(skip(options))]
pub async fn image(options: &ClientOptions) -> Result<()> {
    let image = options.api_client()?.fetch_image().await?;
    print_image(&image);
    Ok(())
}

/// Reads a `DemographicInput` JSON object from a file, or stdin for `-`.
pub fn read_input(path: &Path) -> Result<DemographicInput> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read input from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display()))?
    };

    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Input {} is not valid JSON", path.display()))?;
    Ok(DemographicInput::try_from(value)?)
}

/// What the user sees when a command fails.
///
/// Domain failures get the classified message and a retry hint when another
/// attempt could succeed; anything else is printed with its context chain.
pub fn describe_failure(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ErrorReport>() {
        Some(report) => {
            let classification = classify(report);
            if classification.retryable {
                format!("{}\n{}", classification.display_message, RETRY_HINT)
            } else {
                classification.display_message
            }
        }
        None => format!("Error: {:#}", err),
    }
}

fn print_plan(plan: &WorkoutPlan) {
    if plan.is_empty() {
        println!("No workouts in this plan.");
        return;
    }
    println!("Your workout plan:");
    let width = plan.0.keys().map(|name| name.len()).max().unwrap_or(0);
    for (name, reps) in &plan.0 {
        println!("  {:<width$}  {} reps", name, reps, width = width);
    }
}

fn print_quote(quote: &Quote) {
    if quote.quote.is_empty() {
        println!("No quote available right now.");
        return;
    }
    println!("\"{}\"", quote.quote);
    if !quote.author.is_empty() {
        println!("  - {}", quote.author);
    }
}

fn print_image(image: &ImageInfo) {
    println!("{}", image.image_url);
    println!("{}", image.alt);
    println!("Photo by {} ({})", image.photographer, image.photographer_url);
}
