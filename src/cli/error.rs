//! CLI error types and conversions

use crate::collector::{CollectError, RateLimitError};
use crate::fetcher::FetcherError;
use crate::identifier::IdentifierError;
use crate::resume::ResumeError;
use crate::roster::RosterError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Identifier error
    #[error("identifier error: {0}")]
    IdentifierError(#[from] IdentifierError),

    /// Collection error
    #[error("collection error: {0}")]
    CollectError(#[from] CollectError),

    /// Fetcher error
    #[error("fetcher error: {0}")]
    FetcherError(#[from] FetcherError),

    /// Roster error
    #[error("roster error: {0}")]
    RosterError(#[from] RosterError),

    /// Resume error
    #[error("resume error: {0}")]
    ResumeError(#[from] ResumeError),

    /// Rate limiter misconfigured
    #[error("rate limit error: {0}")]
    RateLimitError(#[from] RateLimitError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// Files on disk failed verification
    #[error("verification failed: {0}")]
    VerificationFailed(String),
}
