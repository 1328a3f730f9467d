//! Environment and clock operations.

use chrono::{Local, NaiveDate};
use std::env;

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn env_var_impl(&self, key: &str) -> Result<String, env::VarError> {
        env::var(key)
    }

    pub(crate) fn today_impl(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}
