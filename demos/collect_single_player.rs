//! Example: collect one player's regular-season game logs
//!
//! Run with: cargo run --example collect_single_player -- 2544 2018 2020
//!
//! Arguments are a player ID and an inclusive season range. Output lands in
//! `demo-data/`; running it again reuses the checkpoint and makes no request.

use gamelog_collector::collector::{CollectionJob, Collector, RetryPolicy, Supervisor};
use gamelog_collector::fetcher::nba_stats::NbaStatsFetcher;
use gamelog_collector::identifier::{EntityId, Season, SeasonRange};
use gamelog_collector::output::OutputLayout;
use gamelog_collector::roster::RosterFilter;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("gamelog_collector=info")
        .init();

    let mut args = std::env::args().skip(1);
    let player: EntityId = args.next().as_deref().unwrap_or("2544").parse()?;
    let start = Season::parse(args.next().as_deref().unwrap_or("2018"))?;
    let end = Season::parse(args.next().as_deref().unwrap_or("2020"))?;

    let seasons = SeasonRange::new(start, end)?;
    let job = CollectionJob::new(OutputLayout::new("demo-data", seasons)).with_filter(RosterFilter {
        ids: vec![player],
        ..RosterFilter::default()
    });

    let mut collector = Collector::new(Arc::new(NbaStatsFetcher::new()?), job)?;
    let policy = RetryPolicy {
        max_attempts: 3,
        ..RetryPolicy::default()
    };
    let summary = Supervisor::new(policy).run(&mut collector).await?;

    println!(
        "player {player}: {} games across {} seasons -> {}",
        summary.aggregate_rows,
        seasons.len(),
        summary.aggregate_path.display()
    );
    Ok(())
}
