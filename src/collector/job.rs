//! Collection job specification and run results

use std::path::PathBuf;

use super::config::DelayRange;
use crate::identifier::{EntityId, SeasonRange};
use crate::output::OutputLayout;
use crate::resume::ResumeGranularity;
use crate::roster::RosterFilter;
use crate::SeasonType;

/// What a [`super::Collector`] collects and where it writes
#[derive(Debug, Clone)]
pub struct CollectionJob {
    /// Output paths; also carries the season range and season type
    pub layout: OutputLayout,
    /// What a restart may skip
    pub granularity: ResumeGranularity,
    /// Randomized pause between fetches
    pub pacing: DelayRange,
    /// Which roster players to collect
    pub filter: RosterFilter,
}

impl CollectionJob {
    /// Job with default pacing, entity granularity and the default filter
    pub fn new(layout: OutputLayout) -> Self {
        Self {
            layout,
            granularity: ResumeGranularity::default(),
            pacing: DelayRange::default(),
            filter: RosterFilter::default(),
        }
    }

    /// Collect a different season type
    pub fn with_season_type(mut self, season_type: SeasonType) -> Self {
        self.layout = self.layout.with_season_type(season_type);
        self
    }

    /// Set the resume granularity
    pub fn with_granularity(mut self, granularity: ResumeGranularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Set the pacing delay
    pub fn with_pacing(mut self, pacing: DelayRange) -> Self {
        self.pacing = pacing;
        self
    }

    /// Set the roster filter
    pub fn with_filter(mut self, filter: RosterFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Season range
    pub fn seasons(&self) -> SeasonRange {
        self.layout.seasons()
    }

    /// Season type
    pub fn season_type(&self) -> SeasonType {
        self.layout.season_type()
    }

    /// Validate job before execution
    pub fn validate(&self) -> Result<(), String> {
        if self.filter.limit == Some(0) {
            return Err("limit must be at least 1".to_string());
        }
        if self.filter.ids.iter().any(|id| id.as_u64() == 0) {
            return Err("player IDs must be positive".to_string());
        }
        Ok(())
    }
}

/// How one player was satisfied during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityOutcome {
    /// Loaded from an existing checkpoint, no fetch issued
    Resumed {
        /// Player
        entity: EntityId,
        /// Rows in the checkpoint
        rows: usize,
    },
    /// Fetched (possibly partly from the journal) and checkpointed
    Fetched {
        /// Player
        entity: EntityId,
        /// Rows committed
        rows: usize,
        /// Seasons fetched this run
        fetched_seasons: usize,
        /// Seasons recovered from the journal
        journaled_seasons: usize,
    },
}

impl EntityOutcome {
    /// Player
    pub fn entity(&self) -> EntityId {
        match self {
            Self::Resumed { entity, .. } | Self::Fetched { entity, .. } => *entity,
        }
    }

    /// Rows contributed to the aggregate
    pub fn rows(&self) -> usize {
        match self {
            Self::Resumed { rows, .. } | Self::Fetched { rows, .. } => *rows,
        }
    }

    /// Whether the player came from a checkpoint
    pub fn is_resumed(&self) -> bool {
        matches!(self, Self::Resumed { .. })
    }
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Players selected for the run
    pub entities_total: usize,
    /// Players fetched this run
    pub entities_fetched: usize,
    /// Players loaded from checkpoints
    pub entities_resumed: usize,
    /// Work unit fetches issued
    pub fetches: usize,
    /// Seasons recovered from the journal
    pub journaled_units: usize,
    /// Rows in the aggregate
    pub aggregate_rows: usize,
    /// Aggregate file
    pub aggregate_path: PathBuf,
    /// Per-player outcomes in collection order
    pub outcomes: Vec<EntityOutcome>,
}

impl RunSummary {
    pub(crate) fn new(entities_total: usize, aggregate_path: PathBuf) -> Self {
        Self {
            entities_total,
            entities_fetched: 0,
            entities_resumed: 0,
            fetches: 0,
            journaled_units: 0,
            aggregate_rows: 0,
            aggregate_path,
            outcomes: Vec::with_capacity(entities_total),
        }
    }

    pub(crate) fn record(&mut self, outcome: EntityOutcome) {
        match &outcome {
            EntityOutcome::Resumed { .. } => self.entities_resumed += 1,
            EntityOutcome::Fetched {
                journaled_seasons, ..
            } => {
                self.entities_fetched += 1;
                self.journaled_units += journaled_seasons;
            }
        }
        self.outcomes.push(outcome);
    }
}
