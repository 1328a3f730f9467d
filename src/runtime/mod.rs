//! Runtime abstraction for process-level inputs.
//!
//! Environment variables and the current date are read through the [`Runtime`]
//! trait so configuration loading and age computation can be tested with a
//! mock instead of the real process environment and clock.

mod env;

use chrono::NaiveDate;
use std::env as std_env;

#[cfg_attr(test, mockall::automock)]
pub trait Runtime: Send + Sync {
    // Environment
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError>;

    // Clock
    /// Today's date in the local time zone.
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RealRuntime;

impl Runtime for RealRuntime {
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError> {
        self.env_var_impl(key)
    }

    fn today(&self) -> NaiveDate {
        self.today_impl()
    }
}

/// Reads an optional, non-blank environment variable.
pub fn optional_var<R: Runtime + ?Sized>(runtime: &R, key: &str) -> Option<String> {
    runtime
        .env_var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
