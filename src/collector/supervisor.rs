//! Bounded whole-run restart
//!
//! Failed runs are rerun from scratch after
//! `initial * 2^(attempt-1)` (capped) plus random jitter. Checkpoints make each
//! rerun incremental. After `max_attempts` failures the supervisor gives up
//! with [`CollectError::RetriesExhausted`].

use std::time::Duration;
use tracing::{error, info, warn};

use super::config::{calculate_backoff, INITIAL_BACKOFF, MAX_ATTEMPTS, MAX_BACKOFF, RESTART_JITTER};
use super::executor::Collector;
use super::job::RunSummary;
use super::CollectError;
use crate::fetcher::retry_formatter::RetryContext;
use crate::shutdown::SharedShutdown;

/// Restart policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts before giving up, first run included
    pub max_attempts: u32,
    /// Backoff after the first failure
    pub initial_backoff: Duration,
    /// Backoff cap
    pub max_backoff: Duration,
    /// Upper bound of the uniform jitter added to every backoff
    pub jitter: Duration,
}

impl RetryPolicy {
    /// Policy with no waiting between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// Backoff after `attempt` failures, without jitter
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.initial_backoff, self.max_backoff)
    }

    /// Check the policy is usable
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if self.initial_backoff > self.max_backoff {
            return Err(format!(
                "initial backoff {}s exceeds maximum backoff {}s",
                self.initial_backoff.as_secs(),
                self.max_backoff.as_secs()
            ));
        }
        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_BACKOFF,
            jitter: RESTART_JITTER,
        }
    }
}

/// Reruns a [`Collector`] until it succeeds or the policy runs out
pub struct Supervisor {
    policy: RetryPolicy,
    shutdown: Option<SharedShutdown>,
    rng: fastrand::Rng,
}

impl Supervisor {
    /// Supervisor with an entropy-seeded jitter generator
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            shutdown: None,
            rng: fastrand::Rng::new(),
        }
    }

    /// Make backoff sleeps interruptible
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Deterministic jitter
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    /// Policy in effect
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Backoff before the attempt following `attempt` failures, jitter included
    pub fn backoff_for(&mut self, attempt: u32) -> Duration {
        let jitter_nanos = self.policy.jitter.as_nanos().min(u128::from(u64::MAX)) as u64;
        let jitter = Duration::from_nanos(self.rng.u64(0..=jitter_nanos));
        self.policy.base_backoff(attempt).saturating_add(jitter)
    }

    /// Run `collector` until it succeeds or attempts are exhausted
    pub async fn run(&mut self, collector: &mut Collector) -> Result<RunSummary, CollectError> {
        self.policy.validate().map_err(CollectError::Validation)?;

        let mut attempt = 1;
        let mut last_failure: Option<RetryContext> = None;
        loop {
            info!(attempt, max_attempts = self.policy.max_attempts, "Starting run attempt");

            let err = match collector.run().await {
                Ok(summary) => {
                    if let Some(mut ctx) = last_failure {
                        ctx.attempt = attempt;
                        info!("{}", ctx.format_success());
                    }
                    return Ok(summary);
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                warn!(attempt, error = %err, "Run ended with non-retryable error");
                return Err(err);
            }

            if attempt >= self.policy.max_attempts {
                let ctx = RetryContext::new(
                    attempt,
                    self.policy.max_attempts,
                    err.error_type(),
                    Duration::ZERO,
                    err.work_unit(),
                    err.to_string(),
                );
                error!("{}", ctx.format_failure());
                return Err(CollectError::RetriesExhausted {
                    attempts: attempt,
                    last_error: err.to_string(),
                });
            }

            let backoff = self.backoff_for(attempt);
            let ctx = RetryContext::new(
                attempt,
                self.policy.max_attempts,
                err.error_type(),
                backoff,
                err.work_unit(),
                err.to_string(),
            );
            warn!(attempt, error = %err, "{}", ctx.format_retry());
            crate::metrics::record_restart(attempt, backoff);
            last_failure = Some(ctx);

            let completed = match &self.shutdown {
                Some(shutdown) => shutdown.sleep_unless_shutdown(backoff).await,
                None => {
                    tokio::time::sleep(backoff).await;
                    true
                }
            };
            if !completed {
                info!("Shutdown requested during restart backoff");
                return Err(CollectError::Cancelled);
            }

            attempt += 1;
        }
    }
}
