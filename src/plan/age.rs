//! Age derived from a date of birth.

use chrono::{DateTime, Datelike, NaiveDate};
use log::debug;

/// Used when the date of birth cannot be parsed.
pub const FALLBACK_AGE: u32 = 25;

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (the date as written is used).
pub fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// Whole years between `birth` and `today`; 0 for a birth date in the future.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

/// Age for a raw date-of-birth string, or [`FALLBACK_AGE`] when it does not parse.
pub fn age_from_birth_date(raw: &str, today: NaiveDate) -> u32 {
    match parse_birth_date(raw) {
        Some(birth) => age_on(birth, today),
        None => {
            debug!(
                "Unparseable date of birth {:?}, using age {}",
                raw, FALLBACK_AGE
            );
            FALLBACK_AGE
        }
    }
}
