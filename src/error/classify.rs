//! Turns an [`ErrorReport`] into something a user can read, plus a retry hint.

use super::{ErrorReport, ErrorType};

/// Shown when nothing more specific is known.
pub const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

/// Statuses worth another try regardless of the error type.
const RETRYABLE_STATUSES: [u16; 4] = [408, 500, 502, 503];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub display_message: String,
    pub retryable: bool,
}

pub fn classify(report: &ErrorReport) -> Classification {
    Classification {
        display_message: display_message(report),
        retryable: is_retryable(report),
    }
}

/// A non-empty `message` that says something beyond `error` wins verbatim;
/// otherwise the canned text for the error type.
pub fn display_message(report: &ErrorReport) -> String {
    if let Some(message) = report.message.as_deref()
        && !message.trim().is_empty()
        && message != report.error
    {
        return message.to_string();
    }

    match canned_message(report.error_type) {
        Some(text) => text.to_string(),
        None if !report.error.trim().is_empty() => report.error.clone(),
        None => GENERIC_MESSAGE.to_string(),
    }
}

pub fn is_retryable(report: &ErrorReport) -> bool {
    // Bad input stays bad input, whatever status came with it
    if report.error_type == ErrorType::Validation {
        return false;
    }

    matches!(
        report.error_type,
        ErrorType::Timeout | ErrorType::NetworkError | ErrorType::UnhandledException
    ) || report
        .status_code
        .is_some_and(|status| RETRYABLE_STATUSES.contains(&status))
}

fn canned_message(error_type: ErrorType) -> Option<&'static str> {
    let text = match error_type {
        ErrorType::Validation => {
            "Some of your details look incomplete or invalid. Please review your profile and try again."
        }
        ErrorType::Timeout => {
            "The request took too long to complete. Please check your connection and try again."
        }
        ErrorType::NetworkError => {
            "Unable to reach the server. Please check your internet connection and try again."
        }
        ErrorType::HttpError => {
            "The server returned an unexpected response. Please try again later."
        }
        ErrorType::ParseError => "We received a response we could not understand. Please try again.",
        ErrorType::RateLimit => {
            "Too many requests right now. Please wait a moment before trying again."
        }
        ErrorType::AuthenticationError => {
            "The workout service could not be authenticated. Please contact support."
        }
        ErrorType::ExternalApiError => {
            "A service we depend on is unavailable right now. Please try again later."
        }
        ErrorType::ConfigurationError => {
            "The workout service is not configured correctly. Please contact support."
        }
        ErrorType::AiResponseError => {
            "The workout generator returned an invalid plan. Please try again."
        }
        ErrorType::UnhandledException => GENERIC_MESSAGE,
        ErrorType::NotFound => "The requested resource could not be found.",
        ErrorType::Unknown => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wins_when_distinct() {
        let report = ErrorReport::new(ErrorType::HttpError, "HTTP 500")
            .with_message("The plan service is down for maintenance");
        assert_eq!(
            display_message(&report),
            "The plan service is down for maintenance"
        );
    }

    #[test]
    fn test_message_equal_to_error_is_ignored() {
        let report =
            ErrorReport::new(ErrorType::RateLimit, "slow down").with_message("slow down");
        assert_eq!(
            display_message(&report),
            canned_message(ErrorType::RateLimit).unwrap()
        );
    }

    #[test]
    fn test_blank_message_is_ignored() {
        let report = ErrorReport::new(ErrorType::Timeout, "timed out").with_message("   ");
        assert!(display_message(&report).contains("took too long"));
    }

    #[test]
    fn test_every_known_type_has_canned_text() {
        let types = [
            ErrorType::Validation,
            ErrorType::Timeout,
            ErrorType::NetworkError,
            ErrorType::HttpError,
            ErrorType::ParseError,
            ErrorType::RateLimit,
            ErrorType::AuthenticationError,
            ErrorType::ExternalApiError,
            ErrorType::ConfigurationError,
            ErrorType::AiResponseError,
            ErrorType::UnhandledException,
            ErrorType::NotFound,
        ];
        for error_type in types {
            let report = ErrorReport::new(error_type, "");
            assert!(
                !display_message(&report).is_empty(),
                "no text for {}",
                error_type
            );
        }
    }

    #[test]
    fn test_unknown_type_falls_back_to_error_field() {
        let report = ErrorReport::new(ErrorType::Unknown, "Quota exceeded for today");
        assert_eq!(display_message(&report), "Quota exceeded for today");

        let report = ErrorReport::new(ErrorType::Unknown, "");
        assert_eq!(display_message(&report), GENERIC_MESSAGE);
    }

    #[test]
    fn test_retryable_by_type() {
        for error_type in [
            ErrorType::Timeout,
            ErrorType::NetworkError,
            ErrorType::UnhandledException,
        ] {
            assert!(is_retryable(&ErrorReport::new(error_type, "x")));
        }
        for error_type in [
            ErrorType::ParseError,
            ErrorType::AuthenticationError,
            ErrorType::AiResponseError,
            ErrorType::NotFound,
        ] {
            assert!(!is_retryable(&ErrorReport::new(error_type, "x")));
        }
    }

    #[test]
    fn test_retryable_by_status() {
        for status in [408, 500, 502, 503] {
            let report = ErrorReport::new(ErrorType::HttpError, "x").with_status(status);
            assert!(is_retryable(&report), "status {}", status);
        }
        let report = ErrorReport::new(ErrorType::HttpError, "x").with_status(504);
        assert!(!is_retryable(&report));
    }

    #[test]
    fn test_validation_never_retryable() {
        let report = ErrorReport::new(ErrorType::Validation, "bad").with_status(500);
        let classification = classify(&report);
        assert!(!classification.retryable);
    }
}
