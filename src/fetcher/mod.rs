//! Stats service fetchers
//!
//! The collector only talks to [`StatsFetcher`]; the shipped implementation is
//! [`nba_stats::NbaStatsFetcher`].

use crate::{Entity, Table, WorkUnit};
use async_trait::async_trait;

pub mod nba_stats;
pub mod retry_formatter;
pub mod stats_http;
pub mod stats_parser;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Non-success HTTP status (other than 429)
    #[error("HTTP {status}: {message}")]
    HttpStatus {
        /// Response status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Request exceeded the configured timeout
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// Connection-level failure
    #[error("network error: {0}")]
    NetworkError(String),

    /// Response body could not be decoded
    #[error("parse error: {0}")]
    ParseError(String),

    /// Expected result set absent from the response
    #[error("result set {0:?} missing from response")]
    MissingResultSet(String),

    /// Client could not be constructed
    #[error("client configuration error: {0}")]
    Configuration(String),
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Remote source of rosters and game logs
///
/// Implementations perform exactly one request per call; retrying is the
/// caller's decision.
#[async_trait]
pub trait StatsFetcher: Send + Sync {
    /// Fetch the full reference list of players
    async fn list_entities(&self) -> FetcherResult<Vec<Entity>>;

    /// Fetch one player's game log for one season
    ///
    /// A season with no games played is an empty table, not an error.
    async fn fetch_game_log(&self, unit: &WorkUnit) -> FetcherResult<Table>;

    /// Base URL of the service, for diagnostics
    fn base_url(&self) -> &str;
}
