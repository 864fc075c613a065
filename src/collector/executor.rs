//! The collection loop
//!
//! One [`Collector::run`] is a single pass over the selected players:
//!
//! 1. load (or fetch once) the reference roster and select players
//! 2. per player: reuse the checkpoint if present, else fetch every season,
//!    concatenate and commit the checkpoint
//! 3. union all player tables into the aggregate CSV
//!
//! The first failed fetch ends the pass with [`CollectError::FetchFailed`];
//! nothing partial is checkpointed. Restarting is the supervisor's job.

use indicatif::ProgressBar;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

use super::job::{CollectionJob, EntityOutcome, RunSummary};
use super::progress::{ProgressState, ProgressTracker};
use super::rate_limit::RequestPacer;
use super::CollectError;
use crate::fetcher::StatsFetcher;
use crate::identifier::Season;
use crate::metrics::EntityMetrics;
use crate::output::csv::write_table_atomic;
use crate::resume::{CheckpointStore, ResumeGranularity, WorkUnitJournal};
use crate::roster::Roster;
use crate::shutdown::SharedShutdown;
use crate::{Entity, Table, WorkUnit};

/// Single-pass collector
pub struct Collector {
    fetcher: Arc<dyn StatsFetcher>,
    job: CollectionJob,
    checkpoints: CheckpointStore,
    journal: Option<WorkUnitJournal>,
    pacer: RequestPacer,
    progress_tracker: ProgressTracker,
    progress_bar: Option<ProgressBar>,
    shutdown: Option<SharedShutdown>,
    pause_pending: bool,
}

impl Collector {
    /// Validate `job` and prepare its output directories
    pub fn new(fetcher: Arc<dyn StatsFetcher>, job: CollectionJob) -> Result<Self, CollectError> {
        job.validate().map_err(CollectError::Validation)?;
        job.layout.ensure_dirs()?;

        let checkpoints = CheckpointStore::for_layout(&job.layout);
        let journal = match job.granularity {
            ResumeGranularity::WorkUnit => Some(WorkUnitJournal::for_layout(&job.layout)),
            ResumeGranularity::Entity => None,
        };
        let pacer = RequestPacer::new(job.pacing);

        Ok(Self {
            fetcher,
            job,
            checkpoints,
            journal,
            pacer,
            progress_tracker: ProgressTracker::default(),
            progress_bar: None,
            shutdown: None,
            pause_pending: false,
        })
    }

    /// Attach a shutdown coordinator checked before every fetch
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Override the `[PROGRESS]` cadence
    pub fn with_progress_tracker(mut self, tracker: ProgressTracker) -> Self {
        self.progress_tracker = tracker;
        self
    }

    /// Drive an interactive progress bar (one tick per player)
    pub fn with_progress_bar(mut self, bar: ProgressBar) -> Self {
        self.progress_bar = Some(bar);
        self
    }

    /// Use a deterministic pacing generator
    pub fn with_pacer_seed(mut self, seed: u64) -> Self {
        self.pacer = RequestPacer::with_seed(self.job.pacing, seed);
        self
    }

    /// Job being executed
    pub fn job(&self) -> &CollectionJob {
        &self.job
    }

    /// Checkpoint store used by this collector
    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    /// Run one full pass
    pub async fn run(&mut self) -> Result<RunSummary, CollectError> {
        let seasons = self.job.seasons();
        let span = tracing::info_span!(
            "collect",
            seasons = %seasons,
            season_type = %self.job.season_type(),
            granularity = %self.job.granularity
        );
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&mut self) -> Result<RunSummary, CollectError> {
        self.pause_pending = false;

        let roster =
            Roster::load_or_fetch(&self.job.layout.reference_path(), &*self.fetcher).await?;
        let entities = roster.select(&self.job.filter, &self.job.seasons());

        info!(
            players = entities.len(),
            fetcher = %self.fetcher.base_url(),
            "Starting collection run"
        );

        let mut progress = self.progress_tracker.create_state(entities.len() as u64);
        if let Some(bar) = &self.progress_bar {
            bar.set_length(entities.len() as u64);
            bar.set_position(0);
        }

        let mut summary = RunSummary::new(entities.len(), self.job.layout.aggregate_path());
        let mut tables: Vec<Table> = Vec::with_capacity(entities.len());

        for entity in &entities {
            progress.set_current(Some(entity.id.to_string()));
            let span = tracing::info_span!("collect_entity", player = %entity.id, name = %entity.name);
            let (table, outcome) = self
                .collect_entity(entity, &mut summary)
                .instrument(span)
                .await?;

            progress.record_entity(table.len() as u64, outcome.is_resumed());
            self.report_progress(&mut progress);

            summary.record(outcome);
            tables.push(table);
        }

        let aggregate = Table::concat(tables);
        write_table_atomic(&summary.aggregate_path, &aggregate)?;
        summary.aggregate_rows = aggregate.len();

        if let Some(bar) = &self.progress_bar {
            bar.finish_with_message("collection complete");
        }

        info!(
            players = summary.entities_total,
            fetched = summary.entities_fetched,
            resumed = summary.entities_resumed,
            fetches = summary.fetches,
            rows = summary.aggregate_rows,
            path = %summary.aggregate_path.display(),
            "Collection run complete"
        );
        Ok(summary)
    }

    async fn collect_entity(
        &mut self,
        entity: &Entity,
        summary: &mut RunSummary,
    ) -> Result<(Table, EntityOutcome), CollectError> {
        let metrics = EntityMetrics::start(entity.id);

        if self.checkpoints.exists(entity.id) {
            let table = self.checkpoints.load(entity.id)?;
            debug!(rows = table.len(), "Checkpoint present, skipping fetch");
            metrics.record_success(table.len() as u64, true);
            let outcome = EntityOutcome::Resumed {
                entity: entity.id,
                rows: table.len(),
            };
            return Ok((table, outcome));
        }

        let season_type = self.job.season_type();
        let mut journaled: BTreeMap<Season, Table> = match &self.journal {
            Some(journal) => journal.load(entity.id, season_type)?,
            None => BTreeMap::new(),
        };
        let journaled_seasons = journaled.len();

        let mut season_tables: Vec<Table> = Vec::with_capacity(self.job.seasons().len());
        let mut fetched_seasons = 0;

        for season in self.job.seasons().iter() {
            if let Some(table) = journaled.remove(&season) {
                debug!(season = %season, rows = table.len(), "Season recovered from journal");
                season_tables.push(table);
                continue;
            }

            let unit = WorkUnit {
                entity: entity.id,
                season,
                season_type,
            };
            let table = match self.fetch_unit(&unit, summary).await {
                Ok(table) => table,
                Err(e) => {
                    metrics.record_failure(&e.to_string());
                    return Err(e);
                }
            };
            fetched_seasons += 1;

            if let Some(journal) = &self.journal {
                journal.append(&unit, &table)?;
            }
            season_tables.push(table);
        }

        let table = Table::concat(season_tables);
        self.checkpoints.commit(entity.id, &table)?;
        if let Some(journal) = &self.journal {
            journal.discard(entity.id)?;
        }

        metrics.record_success(table.len() as u64, false);
        let outcome = EntityOutcome::Fetched {
            entity: entity.id,
            rows: table.len(),
            fetched_seasons,
            journaled_seasons,
        };
        Ok((table, outcome))
    }

    /// Pace, check for shutdown, then issue one fetch
    async fn fetch_unit(
        &mut self,
        unit: &WorkUnit,
        summary: &mut RunSummary,
    ) -> Result<Table, CollectError> {
        if self.pause_pending && !self.pacer.pause(self.shutdown.as_ref()).await {
            return Err(self.cancelled());
        }
        if self
            .shutdown
            .as_ref()
            .is_some_and(|s| s.is_shutdown_requested())
        {
            return Err(self.cancelled());
        }

        summary.fetches += 1;
        match self.fetcher.fetch_game_log(unit).await {
            Ok(table) => {
                debug!(season = %unit.season, rows = table.len(), "Fetched work unit");
                self.pause_pending = true;
                Ok(table)
            }
            Err(source) => {
                warn!(unit = %unit, error = %source, "Fetch failed, ending run");
                Err(CollectError::FetchFailed {
                    unit: *unit,
                    source,
                })
            }
        }
    }

    fn cancelled(&self) -> CollectError {
        info!("Shutdown requested, abandoning current player");
        CollectError::Cancelled
    }

    fn report_progress(&self, progress: &mut ProgressState) {
        if let Some(bar) = &self.progress_bar {
            bar.set_position(progress.entities_done);
            if let Some(current) = &progress.current_entity {
                bar.set_message(format!("player {current}"));
            }
        }
        if progress.should_emit_update() {
            info!("{}", progress.format_progress());
            progress.mark_emitted();
        }
    }
}
