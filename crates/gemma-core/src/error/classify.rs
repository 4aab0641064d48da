//! Error classification: which bucket an error falls in and what the console does with it

use super::types::GemmaError;

/// How the console reacts to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rejected synchronously, never sent to the network
    Validation,
    /// Request or stream failed in transit; logged and toasted
    Transport,
    /// Primary endpoint unusable; a client-side fallback takes over
    Degraded,
    /// Reported by the server; surfaced verbatim and run-terminal
    Application,
    /// User-initiated
    Cancellation,
    /// Local problems (config, storage, decoding)
    Internal,
}

impl ErrorCategory {
    /// Short label used in the event log
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Validation => "Invalid input",
            Self::Transport => "Network error",
            Self::Degraded => "Service degraded",
            Self::Application => "Server error",
            Self::Cancellation => "Cancelled",
            Self::Internal => "Internal error",
        }
    }
}

impl GemmaError {
    /// Classify the error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Transport { .. } | Self::Stream { .. } => ErrorCategory::Transport,
            Self::Http { status, .. } if *status == 404 || *status >= 500 => {
                ErrorCategory::Degraded
            }
            Self::NotFound { .. } | Self::MalformedResponse { .. } => ErrorCategory::Degraded,
            Self::Http { .. } | Self::Server { .. } => ErrorCategory::Application,
            Self::Cancelled => ErrorCategory::Cancellation,
            Self::Config { .. } | Self::Json { .. } | Self::Storage { .. } | Self::Other { .. } => {
                ErrorCategory::Internal
            }
        }
    }

    /// Whether the next strategy in a fallback chain may be tried after this error
    pub fn allows_fallback(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Transport | ErrorCategory::Degraded
        )
    }

    /// Whether this error ends a streaming run; one undecodable frame does not
    pub fn is_run_terminal(&self) -> bool {
        !matches!(self, Self::Json { .. } | Self::MalformedResponse { .. })
    }

    /// HTTP status, when the error carries one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    /// Text shown in a toast
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message, .. } => message.clone(),
            Self::Server { detail } => detail.clone(),
            Self::Http { message, .. } if self.category() == ErrorCategory::Application => {
                message.clone()
            }
            Self::Cancelled => "Analysis stopped".to_string(),
            other => format!("{}: {}", other.category().display_name(), other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_and_server_failures_allow_fallback() {
        assert!(GemmaError::http(404, "missing").allows_fallback());
        assert!(GemmaError::http(503, "down").allows_fallback());
        assert!(GemmaError::transport("connection refused").allows_fallback());
        assert!(GemmaError::not_found("artifact").allows_fallback());
        assert!(
            GemmaError::malformed_response("expected value", "/transcripts/count")
                .allows_fallback()
        );
    }

    #[test]
    fn test_client_errors_do_not_fall_back() {
        assert!(!GemmaError::http(400, "bad filter").allows_fallback());
        assert!(!GemmaError::validation("empty prompt").allows_fallback());
        assert!(!GemmaError::server("model crashed").allows_fallback());
        assert!(!GemmaError::json("bad config value").allows_fallback());
    }

    #[test]
    fn test_category_mapping() {
        assert_eq!(
            GemmaError::validation("x").category(),
            ErrorCategory::Validation
        );
        assert_eq!(GemmaError::stream("x").category(), ErrorCategory::Transport);
        assert_eq!(GemmaError::http(500, "x").category(), ErrorCategory::Degraded);
        assert_eq!(
            GemmaError::http(422, "x").category(),
            ErrorCategory::Application
        );
        assert_eq!(GemmaError::Cancelled.category(), ErrorCategory::Cancellation);
    }

    #[test]
    fn test_server_detail_is_surfaced_verbatim() {
        let err = GemmaError::server("GPU slot busy");
        assert_eq!(err.user_message(), "GPU slot busy");
        assert!(err.is_run_terminal());
        assert!(GemmaError::stream("connection reset").is_run_terminal());
        assert!(!GemmaError::json("expected value").is_run_terminal());

        let rejected = GemmaError::http(422, "start_date is invalid");
        assert_eq!(rejected.user_message(), "start_date is invalid");
    }
}
