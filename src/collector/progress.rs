//! Progress tracking for long collection runs.
//!
//! A full run touches thousands of players and can take hours at polite
//! request rates. [`ProgressState`] counts players as they finish (fetched or
//! resumed from a checkpoint) and formats the periodic `[PROGRESS]` lines the
//! collector logs.

use std::time::{Duration, Instant};

const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(60);
const MIN_RUN_DURATION: Duration = Duration::from_secs(30);

/// Lightweight builder that controls update cadence.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    update_interval: Duration,
    min_percentage_step: f64,
}

impl ProgressTracker {
    /// Create a tracker with custom interval and percentage step.
    pub fn new(update_interval: Duration, min_percentage_step: f64) -> Self {
        Self {
            update_interval,
            min_percentage_step,
        }
    }

    /// Build a [`ProgressState`] for `total_entities` players.
    pub fn create_state(&self, total_entities: u64) -> ProgressState {
        let mut state = ProgressState::new(total_entities);
        state.update_interval = self.update_interval;
        state.min_percentage_step = self.min_percentage_step;
        state
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(DEFAULT_UPDATE_INTERVAL, 10.0)
    }
}

/// Per-run progress counters.
#[derive(Debug, Clone)]
pub struct ProgressState {
    /// Players finished this run, fetched or resumed.
    pub entities_done: u64,
    /// Players restored from an existing checkpoint.
    pub entities_resumed: u64,
    /// Total players selected for the run.
    pub total_entities: u64,
    /// Game log rows gathered so far.
    pub rows_collected: u64,
    /// Run start.
    pub start_time: Instant,
    /// Last time progress was reported.
    pub last_update: Instant,
    /// Minimum interval between progress updates.
    pub update_interval: Duration,
    /// Last reported completion percentage.
    pub last_reported_percentage: f64,
    /// Minimum percentage delta required to emit a new update.
    pub min_percentage_step: f64,
    /// Player currently being worked on.
    pub current_entity: Option<String>,
}

impl ProgressState {
    /// Fresh state with default intervals.
    pub fn new(total_entities: u64) -> Self {
        let now = Instant::now();
        Self {
            entities_done: 0,
            entities_resumed: 0,
            total_entities,
            rows_collected: 0,
            start_time: now,
            last_update: now,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            last_reported_percentage: 0.0,
            min_percentage_step: 10.0,
            current_entity: None,
        }
    }

    /// Record one finished player.
    pub fn record_entity(&mut self, rows: u64, resumed: bool) {
        self.entities_done = self.entities_done.saturating_add(1);
        self.rows_collected = self.rows_collected.saturating_add(rows);
        if resumed {
            self.entities_resumed = self.entities_resumed.saturating_add(1);
        }
    }

    /// Label the player currently in flight.
    pub fn set_current<S: Into<String>>(&mut self, entity: Option<S>) {
        self.current_entity = entity.map(Into::into);
    }

    /// Whether a progress update should be emitted based on time or percentage.
    pub fn should_emit_update(&self) -> bool {
        if self.entities_done == 0 {
            return false;
        }

        if self.percentage() - self.last_reported_percentage >= self.min_percentage_step {
            return true;
        }

        self.start_time.elapsed() >= MIN_RUN_DURATION
            && self.last_update.elapsed() >= self.update_interval
    }

    /// Call after emitting a progress log.
    pub fn mark_emitted(&mut self) {
        self.last_update = Instant::now();
        self.last_reported_percentage = self.percentage();
    }

    /// Completion percentage (0-100).
    pub fn percentage(&self) -> f64 {
        if self.total_entities == 0 {
            return 100.0;
        }
        (self.entities_done as f64 / self.total_entities as f64) * 100.0
    }

    /// Estimate remaining time from the rate of freshly fetched players.
    ///
    /// Resumed players complete instantly, so they are left out of the rate.
    pub fn estimate_remaining(&self) -> Option<Duration> {
        let fetched = self.entities_done.saturating_sub(self.entities_resumed);
        let remaining = self.total_entities.saturating_sub(self.entities_done);
        if fetched == 0 || remaining == 0 {
            return None;
        }
        let per_entity = self.start_time.elapsed().as_secs_f64() / fetched as f64;
        Some(Duration::from_secs_f64(per_entity * remaining as f64))
    }

    /// Human-readable progress string for logging.
    pub fn format_progress(&self) -> String {
        let mut parts = vec![
            format!(
                "[PROGRESS] {}/{} players",
                self.entities_done, self.total_entities
            ),
            format!("- {:.1}% complete", self.percentage()),
        ];

        if self.entities_resumed > 0 {
            parts.push(format!("({} resumed)", self.entities_resumed));
        }

        parts.push(format!("- {} rows", self.rows_collected));

        if let Some(current) = &self.current_entity {
            parts.push(format!("[{current}]"));
        }

        if let Some(remaining) = self.estimate_remaining() {
            parts.push(format!("- ~{} remaining", format_duration(remaining)));
        }

        parts.join(" ")
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        format!("{:.1}h", secs as f64 / 3600.0)
    }
}
