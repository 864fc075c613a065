//! Restart message formatting
//!
//! The supervisor restarts whole runs; these types turn the failure that
//! triggered a restart into consistent log lines and a final failure summary.

use std::time::Duration;

use super::FetcherError;
use crate::WorkUnit;

/// Classification of run failures for user messaging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// Request exceeded its timeout
    NetworkTimeout,
    /// Connection refused, DNS failure, or other offline scenarios
    NetworkOffline,
    /// HTTP 429 rate limit exceeded
    RateLimit,
    /// HTTP 5xx server error
    ServerError(u16),
    /// HTTP 4xx other than 429
    ClientError(u16),
    /// Response did not have the expected shape
    MalformedResponse,
    /// Local checkpoint, journal or output failure
    Storage,
}

impl RetryErrorType {
    /// Classify a fetch failure
    pub fn from_fetcher_error(err: &FetcherError) -> Self {
        match err {
            FetcherError::Timeout(_) => Self::NetworkTimeout,
            FetcherError::RateLimitExceeded => Self::RateLimit,
            FetcherError::HttpStatus { status, .. } if *status == 429 => Self::RateLimit,
            FetcherError::HttpStatus { status, .. } if *status >= 500 => Self::ServerError(*status),
            FetcherError::HttpStatus { status, .. } => Self::ClientError(*status),
            FetcherError::NetworkError(_) | FetcherError::Configuration(_) => Self::NetworkOffline,
            FetcherError::ParseError(_) | FetcherError::MissingResultSet(_) => {
                Self::MalformedResponse
            }
        }
    }

    /// User-friendly description string used inside restart log messages
    pub fn description(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "request timeout",
            Self::NetworkOffline => "connection failed",
            Self::RateLimit => "rate limit exceeded",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::ClientError(code) => match code {
                400 => "invalid request",
                403 => "request refused (403)",
                404 => "resource not found",
                _ => "client error",
            },
            Self::MalformedResponse => "unexpected response shape",
            Self::Storage => "local storage error",
        }
    }

    /// Suggested remediation shown once retries are exhausted
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "The stats service is slow to answer; raise --timeout-secs",
            Self::NetworkOffline => "Verify internet connectivity and DNS resolution",
            Self::RateLimit => "Lower --requests-per-minute or widen the pacing delay",
            Self::ServerError(_) => "The stats service may be down, try again later",
            Self::ClientError(_) => "Check the season range and season type arguments",
            Self::MalformedResponse => "The endpoint schema may have changed; inspect the raw response",
            Self::Storage => "Check free disk space and permissions on --output-dir",
        }
    }
}

/// Context for formatting restart messages
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Attempt that just failed (1-based)
    pub attempt: u32,
    /// Maximum number of attempts configured
    pub max_attempts: u32,
    /// Type of error that ended the attempt
    pub error_type: RetryErrorType,
    /// Delay before the next attempt
    pub backoff_duration: Duration,
    /// Work unit being fetched when the attempt failed, if any
    pub unit: Option<WorkUnit>,
    /// Original error message
    pub error_message: String,
}

impl RetryContext {
    /// Convenience constructor used by the supervisor
    pub fn new(
        attempt: u32,
        max_attempts: u32,
        error_type: RetryErrorType,
        backoff_duration: Duration,
        unit: Option<WorkUnit>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_type,
            backoff_duration,
            unit,
            error_message: error_message.into(),
        }
    }

    /// Standardized restart message with attempt counters and context
    pub fn format_retry(&self) -> String {
        let mut message = format!(
            "Restarting run (attempt {}/{}) after {} - waiting {:.1} seconds...",
            self.attempt + 1,
            self.max_attempts,
            self.error_type.description(),
            self.backoff_duration.as_secs_f64()
        );
        append_unit(&mut message, self.unit.as_ref());
        message
    }

    /// Message logged when a restarted run finally completes
    pub fn format_success(&self) -> String {
        format!(
            "Run attempt {}/{} succeeded - collection complete",
            self.attempt, self.max_attempts
        )
    }

    /// Final failure summary with actionable suggestions
    pub fn format_failure(&self) -> String {
        let mut lines = vec![
            format!("[FAILED] Collection failed after {} attempts", self.attempt),
            format!("  Last error: {}", self.error_message),
        ];

        let unit_display = self
            .unit
            .map(|u| u.to_string())
            .unwrap_or_else(|| "none".to_string());
        lines.push(format!("  Work unit: {unit_display}"));
        lines.push("  Completed players keep their checkpoints; rerun to resume.".to_string());
        lines.push("  Suggestions:".to_string());

        for suggestion in self.format_suggestions() {
            lines.push(format!("    - {suggestion}"));
        }

        lines.join("\n")
    }

    /// Suggestions tailored to the failure
    pub fn format_suggestions(&self) -> Vec<String> {
        vec![
            self.error_type.suggestion().to_string(),
            format!(
                "Try increasing --max-attempts (current: {})",
                self.max_attempts
            ),
        ]
    }
}

fn append_unit(buffer: &mut String, unit: Option<&WorkUnit>) {
    if let Some(unit) = unit {
        buffer.push_str(&format!(" [{unit}]"));
    }
}
