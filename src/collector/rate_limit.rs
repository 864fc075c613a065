//! Request scheduling
//!
//! Two layers space requests out:
//! - [`RateLimiter`]: hard cap of N requests per rolling window
//! - [`RequestPacer`]: randomized pause between consecutive fetches

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::debug;

use super::config::{DelayRange, DEFAULT_RATE_WINDOW, DEFAULT_REQUESTS_PER_WINDOW};
use crate::shutdown::SharedShutdown;

/// Windowed rate limiter
///
/// Each acquired permit is held for one full window before it is returned,
/// so no window ever admits more than `max_requests` acquisitions.
#[derive(Clone)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    /// Allow at most `max_requests` per `window`
    pub fn per_window(max_requests: usize, window: Duration) -> Result<Self, RateLimitError> {
        if max_requests == 0 {
            return Err(RateLimitError::InvalidConfig(
                "max_requests must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(max_requests)),
            max_requests,
            window,
        })
    }

    /// Allow at most `max_requests` per minute
    pub fn per_minute(max_requests: usize) -> Result<Self, RateLimitError> {
        Self::per_window(max_requests, Duration::from_secs(60))
    }

    /// Maximum requests per window
    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Window length
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Permits currently free
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Acquire `weight` permits, waiting for earlier windows to expire if needed
    pub async fn acquire(&self, weight: usize) -> Result<(), RateLimitError> {
        if weight > self.max_requests {
            return Err(RateLimitError::WeightTooLarge {
                weight,
                max: self.max_requests,
            });
        }

        let permit = self
            .semaphore
            .clone()
            .acquire_many_owned(weight as u32)
            .await
            .map_err(|e| RateLimitError::AcquireError(e.to_string()))?;

        crate::metrics::record_rate_limit_permits(self.available_permits());

        // Hold the permit for the window, then release
        let window = self.window;
        tokio::spawn(async move {
            sleep(window).await;
            drop(permit);
        });

        Ok(())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(DEFAULT_REQUESTS_PER_WINDOW)),
            max_requests: DEFAULT_REQUESTS_PER_WINDOW,
            window: DEFAULT_RATE_WINDOW,
        }
    }
}

/// Randomized pause between consecutive fetches
pub struct RequestPacer {
    delay: DelayRange,
    rng: fastrand::Rng,
}

impl RequestPacer {
    /// Pacer drawing from `delay` with an entropy-seeded generator
    pub fn new(delay: DelayRange) -> Self {
        Self {
            delay,
            rng: fastrand::Rng::new(),
        }
    }

    /// Pacer with a deterministic generator
    pub fn with_seed(delay: DelayRange, seed: u64) -> Self {
        Self {
            delay,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Configured bounds
    pub fn delay_range(&self) -> DelayRange {
        self.delay
    }

    /// Draw the next pause
    pub fn next_delay(&mut self) -> Duration {
        self.delay.sample(&mut self.rng)
    }

    /// Sleep for the next pause
    ///
    /// Returns `false` if shutdown was requested before or during the pause.
    pub async fn pause(&mut self, shutdown: Option<&SharedShutdown>) -> bool {
        let delay = self.next_delay();
        debug!(delay_ms = delay.as_millis() as u64, "Pacing before next fetch");
        crate::metrics::record_pacing_delay(delay);

        match shutdown {
            Some(shutdown) => shutdown.sleep_unless_shutdown(delay).await,
            None => {
                sleep(delay).await;
                true
            }
        }
    }
}

/// Rate limiter errors
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// Failed to acquire permits
    #[error("failed to acquire rate limit permits: {0}")]
    AcquireError(String),

    /// Request weight can never be satisfied
    #[error("weight {weight} exceeds limiter capacity {max}")]
    WeightTooLarge {
        /// Requested weight
        weight: usize,
        /// Limiter capacity
        max: usize,
    },

    /// Limiter parameters are unusable
    #[error("invalid rate limit configuration: {0}")]
    InvalidConfig(String),
}
