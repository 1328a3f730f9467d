//! Retry policy for network operations: fixed attempt count, linear backoff.

use std::borrow::Cow;
use std::time::Duration;

use crate::error::ErrorReport;

/// Maximum number of attempts for a client call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Backoff unit; the wait after attempt `i` (0-based) is `(i + 1)` units.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound for a single attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Response bodies and error messages are cut to this many characters in logs
/// and diagnostics.
pub const LOG_BODY_LIMIT: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Checks `max_attempts >= 1` and `timeout > 0`.
    pub fn validate(&self) -> Result<(), ErrorReport> {
        if self.max_attempts == 0 {
            return Err(ErrorReport::validation("maxAttempts must be at least 1"));
        }
        if self.timeout.is_zero() {
            return Err(ErrorReport::validation("timeout must be greater than zero"));
        }
        Ok(())
    }

    /// Wait inserted after the failed attempt with 0-based index `attempt`.
    /// `None` after the final attempt.
    pub fn backoff_after(&self, attempt: u32) -> Option<Duration> {
        if attempt + 1 >= self.max_attempts {
            return None;
        }
        Some(self.base_delay * (attempt + 1))
    }

    /// Sum of every backoff when all attempts fail: `1 + 2 + ... + (N - 1)` units.
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_attempts)
            .filter_map(|attempt| self.backoff_after(attempt))
            .sum()
    }
}

/// Cuts `text` to [`LOG_BODY_LIMIT`] characters, on a char boundary.
pub fn truncate_for_log(text: &str) -> Cow<'_, str> {
    match text.char_indices().nth(LOG_BODY_LIMIT) {
        Some((cut, _)) => Cow::Owned(format!("{}...", &text[..cut])),
        None => Cow::Borrowed(text),
    }
}
