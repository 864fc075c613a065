//! `collect` command

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{Cli, CliError, OutputFormat};
use crate::collector::config::{
    DEFAULT_FIRST_SEASON, DEFAULT_LAST_SEASON, DEFAULT_REQUESTS_PER_WINDOW, INITIAL_BACKOFF,
    MAX_ATTEMPTS, MAX_BACKOFF, RESTART_JITTER,
};
use crate::collector::{
    CollectionJob, Collector, DelayRange, RateLimiter, RetryPolicy, RunSummary, Supervisor,
};
use crate::fetcher::nba_stats::{NbaStatsFetcher, DEFAULT_BASE_URL};
use crate::identifier::{EntityId, Season, SeasonRange};
use crate::output::OutputLayout;
use crate::resume::ResumeGranularity;
use crate::roster::RosterFilter;
use crate::shutdown::SharedShutdown;
use crate::SeasonType;

/// Arguments of `collect`
#[derive(Args, Debug, Clone)]
pub struct CollectArgs {
    /// First season (2014 or 2014-15)
    #[arg(long, default_value_t = default_season(DEFAULT_FIRST_SEASON))]
    pub start_season: Season,

    /// Last season, inclusive
    #[arg(long, default_value_t = default_season(DEFAULT_LAST_SEASON))]
    pub end_season: Season,

    /// Season type: regular, playoffs, preseason, all-star
    #[arg(long, default_value_t = SeasonType::RegularSeason)]
    pub season_type: SeasonType,

    /// Minimum pause between fetches (milliseconds)
    #[arg(long, default_value_t = 100)]
    pub min_delay_ms: u64,

    /// Maximum pause between fetches (milliseconds)
    #[arg(long, default_value_t = 500)]
    pub max_delay_ms: u64,

    /// Hard cap on requests per minute
    #[arg(long, default_value_t = DEFAULT_REQUESTS_PER_WINDOW)]
    pub requests_per_minute: usize,

    /// Whole-run attempts before giving up
    #[arg(long, default_value_t = MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub max_attempts: u32,

    /// Backoff after the first failed run (seconds)
    #[arg(long, default_value_t = INITIAL_BACKOFF.as_secs())]
    pub initial_backoff_secs: u64,

    /// Cap on the restart backoff (seconds)
    #[arg(long, default_value_t = MAX_BACKOFF.as_secs())]
    pub max_backoff_secs: u64,

    /// What a restart may skip: entity or work-unit
    #[arg(long, default_value_t = ResumeGranularity::Entity)]
    pub resume: ResumeGranularity,

    /// Collect only these player IDs (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub players: Vec<EntityId>,

    /// Only players currently on a roster
    #[arg(long, default_value_t = false)]
    pub active_only: bool,

    /// Include players whose careers do not overlap the season range
    #[arg(long, default_value_t = false)]
    pub all_careers: bool,

    /// Stop after this many players
    #[arg(long)]
    pub limit: Option<usize>,

    /// Stats service host
    #[arg(long, env = "NBA_STATS_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Per-request timeout (seconds)
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Serve Prometheus metrics on this address
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}

fn default_season(year: u16) -> Season {
    // Compile-time constants inside the accepted range
    Season::new(year).unwrap_or_else(|_| Season::current())
}

impl CollectArgs {
    /// Season range from the start/end flags
    pub fn season_range(&self) -> Result<SeasonRange, CliError> {
        Ok(SeasonRange::new(self.start_season, self.end_season)?)
    }

    /// Pacing delay from the min/max flags
    pub fn pacing(&self) -> Result<DelayRange, CliError> {
        DelayRange::new(
            Duration::from_millis(self.min_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
        .map_err(CliError::InvalidArgument)
    }

    /// Restart policy from the attempt/backoff flags
    pub fn retry_policy(&self) -> Result<RetryPolicy, CliError> {
        let policy = RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_secs(self.initial_backoff_secs),
            max_backoff: Duration::from_secs(self.max_backoff_secs),
            jitter: RESTART_JITTER,
        };
        policy.validate().map_err(CliError::InvalidArgument)?;
        Ok(policy)
    }

    /// Player selection from the filter flags
    pub fn roster_filter(&self) -> RosterFilter {
        RosterFilter {
            ids: self.players.clone(),
            active_only: self.active_only,
            require_overlap: !self.all_careers,
            limit: self.limit,
        }
    }

    /// Build the job described by these arguments
    pub fn build_job(&self, cli: &Cli) -> Result<CollectionJob, CliError> {
        let layout = OutputLayout::new(cli.output_dir.clone(), self.season_range()?);
        Ok(CollectionJob::new(layout)
            .with_season_type(self.season_type)
            .with_granularity(self.resume)
            .with_pacing(self.pacing()?)
            .with_filter(self.roster_filter()))
    }

    /// Execute the command
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<(), CliError> {
        let job = self.build_job(cli)?;
        let policy = self.retry_policy()?;

        if let Some(addr) = self.metrics_addr {
            crate::metrics::init_metrics(addr)
                .await
                .map_err(|e| CliError::ConfigurationError(e.to_string()))?;
        }

        let rate_limiter = Arc::new(RateLimiter::per_minute(self.requests_per_minute)?);
        let fetcher = NbaStatsFetcher::with_base_url(
            self.base_url.clone(),
            Duration::from_secs(self.timeout_secs),
        )?
        .with_rate_limiter(rate_limiter);

        info!(
            seasons = %job.seasons(),
            season_type = %job.season_type(),
            output_dir = %cli.output_dir.display(),
            resume = %job.granularity,
            "Starting collection"
        );

        let mut collector = Collector::new(Arc::new(fetcher), job)?.with_shutdown(shutdown.clone());
        if cli.output_format == OutputFormat::Human {
            collector = collector.with_progress_bar(create_progress_bar());
        }

        let summary = Supervisor::new(policy)
            .with_shutdown(shutdown)
            .run(&mut collector)
            .await?;

        print_summary(&summary, cli.output_format);
        Ok(())
    }
}

fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} players ({percent}%) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

fn print_summary(summary: &RunSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "players": summary.entities_total,
                "fetched": summary.entities_fetched,
                "resumed": summary.entities_resumed,
                "fetches": summary.fetches,
                "journaled_units": summary.journaled_units,
                "rows": summary.aggregate_rows,
                "aggregate": summary.aggregate_path.display().to_string(),
            });
            println!("{value}");
        }
        OutputFormat::Human => {
            println!(
                "Collected {} players ({} fetched, {} resumed) with {} requests",
                summary.entities_total,
                summary.entities_fetched,
                summary.entities_resumed,
                summary.fetches
            );
            println!(
                "Wrote {} rows to {}",
                summary.aggregate_rows,
                summary.aggregate_path.display()
            );
        }
    }
}
