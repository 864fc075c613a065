//! Collection configuration constants, backoff and pacing delays

use std::time::Duration;

/// First season collected when none is given
pub const DEFAULT_FIRST_SEASON: u16 = 2014;

/// Last season collected when none is given
pub const DEFAULT_LAST_SEASON: u16 = 2024;

/// Lower bound of the randomized pause between fetches
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(100);

/// Upper bound of the randomized pause between fetches
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(500);

/// Requests admitted per rate window.
/// The stats service starts refusing sustained bursts well before 60/min.
pub const DEFAULT_REQUESTS_PER_WINDOW: usize = 30;

/// Length of the rate window
pub const DEFAULT_RATE_WINDOW: Duration = Duration::from_secs(60);

/// Maximum number of whole-run attempts before giving up
pub const MAX_ATTEMPTS: u32 = 8;

/// Backoff before the second attempt
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(5);

/// Cap on the exponential restart backoff
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Upper bound of the random jitter added to each restart backoff
pub const RESTART_JITTER: Duration = Duration::from_secs(2);

/// Exponential backoff after `attempt` failed attempts (1-based)
///
/// `initial * 2^(attempt-1)`, capped at `max`.
pub fn calculate_backoff(attempt: u32, initial: Duration, max: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    initial
        .checked_mul(2u32.pow(exponent))
        .unwrap_or(max)
        .min(max)
}

/// Closed interval a randomized delay is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    /// Build a range; `min` must not exceed `max`
    pub fn new(min: Duration, max: Duration) -> Result<Self, String> {
        if min > max {
            return Err(format!(
                "minimum delay {}ms exceeds maximum delay {}ms",
                min.as_millis(),
                max.as_millis()
            ));
        }
        Ok(Self { min, max })
    }

    /// A fixed delay
    pub fn fixed(delay: Duration) -> Self {
        Self { min: delay, max: delay }
    }

    /// No delay at all
    pub fn none() -> Self {
        Self::fixed(Duration::ZERO)
    }

    /// Lower bound
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Upper bound
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draw a delay uniformly from `[min, max]`
    pub fn sample(&self, rng: &mut fastrand::Rng) -> Duration {
        let lo = self.min.as_nanos().min(u128::from(u64::MAX)) as u64;
        let hi = self.max.as_nanos().min(u128::from(u64::MAX)) as u64;
        if lo == hi {
            return self.min;
        }
        Duration::from_nanos(rng.u64(lo..=hi))
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_DELAY,
            max: DEFAULT_MAX_DELAY,
        }
    }
}
