//! Collection orchestration and request scheduling
//!
//! # Overview
//!
//! 1. **Job**: what to collect and where, via [`job::CollectionJob`]
//! 2. **Run**: [`executor::Collector`] walks players and seasons once,
//!    checkpointing each finished player and writing the aggregate
//! 3. **Restart**: [`supervisor::Supervisor`] reruns failed runs with
//!    exponential backoff, up to a fixed number of attempts
//! 4. **Scheduling**: [`rate_limit::RateLimiter`] caps requests per window,
//!    [`rate_limit::RequestPacer`] adds randomized pauses
//!
//! A run never retries an individual fetch. Any failure ends the run; the
//! next attempt skips every player that already has a checkpoint.
//!
//! # Components
//!
//! - [`executor`] - The collection loop
//! - [`supervisor`] - Bounded whole-run restart
//! - [`job`] - Job specification and run summary
//! - [`rate_limit`] - Rate limiting and pacing
//! - [`progress`] - `[PROGRESS]` reporting
//! - [`config`] - Defaults and backoff calculation

pub mod config;
pub mod executor;
pub mod job;
pub mod progress;
pub mod rate_limit;
pub mod supervisor;

pub use config::DelayRange;
pub use executor::Collector;
pub use job::{CollectionJob, EntityOutcome, RunSummary};
pub use rate_limit::{RateLimitError, RateLimiter, RequestPacer};
pub use supervisor::{RetryPolicy, Supervisor};

use crate::fetcher::retry_formatter::RetryErrorType;
use crate::fetcher::FetcherError;
use crate::output::OutputError;
use crate::resume::ResumeError;
use crate::roster::RosterError;
use crate::WorkUnit;

/// Collection errors
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// A work unit fetch failed; the run ends here
    #[error("fetch failed for {unit}: {source}")]
    FetchFailed {
        /// Unit being fetched
        unit: WorkUnit,
        /// Underlying fetch error
        #[source]
        source: FetcherError,
    },

    /// Reference roster could not be loaded or fetched
    #[error("roster error: {0}")]
    Roster(#[from] RosterError),

    /// Checkpoint or journal failure
    #[error("resume error: {0}")]
    Resume(#[from] ResumeError),

    /// Aggregate or directory failure
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// Rate limiter failure
    #[error("rate limit error: {0}")]
    RateLimit(#[from] RateLimitError),

    /// Invalid job or policy; never retried
    #[error("validation error: {0}")]
    Validation(String),

    /// Shutdown was requested
    #[error("collection cancelled by shutdown request")]
    Cancelled,

    /// Every attempt failed
    #[error("giving up after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Attempts made
        attempts: u32,
        /// Error of the final attempt
        last_error: String,
    },
}

impl CollectError {
    /// Work unit in flight when the error occurred
    pub fn work_unit(&self) -> Option<WorkUnit> {
        match self {
            Self::FetchFailed { unit, .. } => Some(*unit),
            _ => None,
        }
    }

    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::Validation(_) | Self::Cancelled | Self::RetriesExhausted { .. }
        )
    }

    /// Classification for restart messages
    pub fn error_type(&self) -> RetryErrorType {
        match self {
            Self::FetchFailed { source, .. } | Self::Roster(RosterError::Fetch(source)) => {
                RetryErrorType::from_fetcher_error(source)
            }
            Self::RateLimit(_) => RetryErrorType::RateLimit,
            _ => RetryErrorType::Storage,
        }
    }
}
