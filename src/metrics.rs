//! Observability metrics for the game log collector
//!
//! Tracks request volume and latency, 429 responses, rate limiter headroom,
//! pacing delays, whole-run restarts and per-player completions.
//!
//! ## Architecture
//!
//! - Uses the `metrics` crate facade; recording is a no-op until an exporter
//!   is installed
//! - [`init_metrics`] installs a Prometheus scrape endpoint (`--metrics-addr`)

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::identifier::EntityId;

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<Arc<RwLock<bool>>> = Lazy::new(|| Arc::new(RwLock::new(false)));

/// Initialize metrics system with Prometheus exporter
///
/// Idempotent; later calls are ignored.
///
/// # Arguments
/// * `addr` - Socket address to bind the scrape endpoint (e.g., "127.0.0.1:9090")
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "Total number of HTTP requests made to the stats service"
    );
    describe_counter!(
        "http_429_errors_total",
        Unit::Count,
        "Total number of 429 rate limit errors received"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request duration in seconds"
    );
    describe_gauge!(
        "rate_limit_permits_available",
        Unit::Count,
        "Currently available rate limit permits"
    );
    describe_histogram!(
        "pacing_delay_seconds",
        Unit::Seconds,
        "Randomized pause inserted between fetches"
    );
    describe_counter!(
        "run_restarts_total",
        Unit::Count,
        "Total number of whole-run restarts"
    );
    describe_histogram!(
        "restart_backoff_duration_seconds",
        Unit::Seconds,
        "Backoff slept before a run restart"
    );
    describe_counter!(
        "entities_completed_total",
        Unit::Count,
        "Players finished, labelled fetched or resumed"
    );
    describe_counter!(
        "entities_failed_total",
        Unit::Count,
        "Players whose collection failed"
    );
    describe_counter!(
        "game_log_rows_total",
        Unit::Count,
        "Game log rows gathered"
    );

    *initialized = true;
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Record one completed HTTP exchange
pub fn record_http_request(endpoint: &str, status_code: u16, duration: Duration) {
    counter!(
        "http_requests_total",
        "endpoint" => endpoint.to_string(),
        "status" => status_code.to_string(),
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "endpoint" => endpoint.to_string(),
    )
    .record(duration.as_secs_f64());

    if status_code == 429 {
        counter!("http_429_errors_total", "endpoint" => endpoint.to_string()).increment(1);
        warn!(
            endpoint = %endpoint,
            duration_ms = duration.as_millis() as u64,
            "Rate limit error (429) recorded"
        );
    }
}

/// Update available permits gauge
pub fn record_rate_limit_permits(available: usize) {
    gauge!("rate_limit_permits_available").set(available as f64);
}

/// Record a pacing pause
pub fn record_pacing_delay(delay: Duration) {
    histogram!("pacing_delay_seconds").record(delay.as_secs_f64());
}

/// Record a whole-run restart and the backoff before it
pub fn record_restart(attempt: u32, backoff: Duration) {
    counter!("run_restarts_total").increment(1);
    histogram!(
        "restart_backoff_duration_seconds",
        "attempt" => attempt.to_string(),
    )
    .record(backoff.as_secs_f64());
}

/// Per-player collection metrics
pub struct EntityMetrics {
    entity: EntityId,
    start_time: Instant,
}

impl EntityMetrics {
    /// Start tracking one player
    pub fn start(entity: EntityId) -> Self {
        Self {
            entity,
            start_time: Instant::now(),
        }
    }

    /// Record a finished player
    pub fn record_success(&self, rows: u64, resumed: bool) {
        let source = if resumed { "resumed" } else { "fetched" };
        counter!("entities_completed_total", "source" => source).increment(1);
        counter!("game_log_rows_total").increment(rows);

        debug!(
            player = %self.entity,
            rows = rows,
            source = source,
            duration_ms = self.start_time.elapsed().as_millis() as u64,
            "Player complete"
        );
    }

    /// Record a failed player
    pub fn record_failure(&self, error: &str) {
        counter!("entities_failed_total").increment(1);

        error!(
            player = %self.entity,
            error = %error,
            duration_secs = self.start_time.elapsed().as_secs(),
            "Player collection failed"
        );
    }
}

/// Check if metrics system is initialized
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}
