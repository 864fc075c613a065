//! Integration tests for whole-run restarts, resume granularity and shutdown

use gamelog_collector::collector::{
    CollectError, CollectionJob, Collector, DelayRange, RetryPolicy, Supervisor,
};
use gamelog_collector::identifier::EntityId;
use gamelog_collector::output::csv::read_table;
use gamelog_collector::resume::{ResumeGranularity, WorkUnitJournal};
use gamelog_collector::shutdown::ShutdownCoordinator;
use gamelog_collector::SeasonType;
use std::sync::Arc;
use tempfile::TempDir;

use crate::support::scripted_fetcher::{layout, season_of, ScriptedFetcher};

const PLAYER_A: u64 = 1001;
const PLAYER_B: u64 = 2002;

fn job(dir: &TempDir, granularity: ResumeGranularity) -> CollectionJob {
    CollectionJob::new(layout(dir.path(), 2014, 2015))
        .with_pacing(DelayRange::none())
        .with_granularity(granularity)
}

#[tokio::test]
async fn test_restart_refetches_whole_player_at_entity_granularity() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new(&[PLAYER_A, PLAYER_B]).fail_once(PLAYER_B, 2015));

    let mut collector = Collector::new(fetcher.clone(), job(&dir, ResumeGranularity::Entity)).unwrap();
    let summary = Supervisor::new(RetryPolicy::immediate(3))
        .run(&mut collector)
        .await
        .unwrap();

    // A finished in the first run and is never fetched again
    assert_eq!(fetcher.calls_for(PLAYER_A, 2014), 1);
    assert_eq!(fetcher.calls_for(PLAYER_A, 2015), 1);
    // B lost both seasons with the failed run
    assert_eq!(fetcher.calls_for(PLAYER_B, 2014), 2);
    assert_eq!(fetcher.calls_for(PLAYER_B, 2015), 2);

    assert_eq!(summary.entities_resumed, 1);
    assert_eq!(summary.entities_fetched, 1);
    assert_eq!(summary.fetches, 2);
    assert_eq!(summary.aggregate_rows, 8);
}

#[tokio::test]
async fn test_restart_skips_journaled_seasons_at_work_unit_granularity() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new(&[PLAYER_A, PLAYER_B]).fail_once(PLAYER_B, 2015));

    let mut collector =
        Collector::new(fetcher.clone(), job(&dir, ResumeGranularity::WorkUnit)).unwrap();
    let summary = Supervisor::new(RetryPolicy::immediate(3))
        .run(&mut collector)
        .await
        .unwrap();

    assert_eq!(fetcher.calls_for(PLAYER_A, 2014), 1);
    assert_eq!(fetcher.calls_for(PLAYER_B, 2014), 1);
    assert_eq!(fetcher.calls_for(PLAYER_B, 2015), 2);

    let b_outcome = summary
        .outcomes
        .iter()
        .find(|o| o.entity() == EntityId::new(PLAYER_B))
        .unwrap();
    assert!(!b_outcome.is_resumed());
    assert_eq!(summary.journaled_units, 1);
    assert_eq!(summary.aggregate_rows, 8);

    // Same rows as a clean run, journal cleaned up
    let b_rows = collector.checkpoints().load(EntityId::new(PLAYER_B)).unwrap();
    assert_eq!(b_rows.len(), 4);
    assert_eq!(b_rows.rows()[0][0], "22014");
    assert_eq!(b_rows.rows()[3][0], "22015");
    let journal = WorkUnitJournal::for_layout(&collector.job().layout);
    assert!(!journal.path_for(EntityId::new(PLAYER_B)).exists());
}

#[tokio::test]
async fn test_journal_survives_failed_run() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new(&[PLAYER_B]).fail_once(PLAYER_B, 2015));

    let mut collector =
        Collector::new(fetcher.clone(), job(&dir, ResumeGranularity::WorkUnit)).unwrap();
    assert!(collector.run().await.is_err());

    let journal = WorkUnitJournal::for_layout(&collector.job().layout);
    let recovered = journal
        .load(EntityId::new(PLAYER_B), SeasonType::RegularSeason)
        .unwrap();
    assert_eq!(recovered.keys().copied().collect::<Vec<_>>(), vec![season_of(2014)]);
    assert!(!collector.checkpoints().exists(EntityId::new(PLAYER_B)));
}

#[tokio::test]
async fn test_exhausted_attempts_report_last_error() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new(&[PLAYER_A, PLAYER_B]).fail_always(PLAYER_B));

    let mut collector = Collector::new(fetcher.clone(), job(&dir, ResumeGranularity::Entity)).unwrap();
    let err = Supervisor::new(RetryPolicy::immediate(3))
        .run(&mut collector)
        .await
        .unwrap_err();

    match err {
        CollectError::RetriesExhausted {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("503"), "unexpected error: {last_error}");
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }

    // One failing fetch of B per attempt; A committed once
    assert_eq!(fetcher.calls_for(PLAYER_B, 2014), 3);
    assert_eq!(fetcher.calls_for(PLAYER_A, 2014), 1);
    assert!(collector.checkpoints().exists(EntityId::new(PLAYER_A)));
    assert!(!collector.checkpoints().exists(EntityId::new(PLAYER_B)));
    assert!(!collector.job().layout.aggregate_path().exists());
}

#[tokio::test]
async fn test_single_attempt_policy_does_not_restart() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new(&[PLAYER_A]).fail_once(PLAYER_A, 2014));

    let mut collector = Collector::new(fetcher.clone(), job(&dir, ResumeGranularity::Entity)).unwrap();
    let err = Supervisor::new(RetryPolicy::immediate(1))
        .run(&mut collector)
        .await
        .unwrap_err();

    assert!(matches!(err, CollectError::RetriesExhausted { attempts: 1, .. }));
    assert_eq!(fetcher.calls().len(), 1);
}

#[tokio::test]
async fn test_shutdown_before_start_fetches_nothing() {
    let dir = TempDir::new().unwrap();
    let shutdown = ShutdownCoordinator::shared();
    shutdown.request_shutdown();
    let fetcher = Arc::new(ScriptedFetcher::new(&[PLAYER_A]));

    let mut collector = Collector::new(fetcher.clone(), job(&dir, ResumeGranularity::Entity))
        .unwrap()
        .with_shutdown(shutdown.clone());
    let err = Supervisor::new(RetryPolicy::immediate(5))
        .with_shutdown(shutdown)
        .run(&mut collector)
        .await
        .unwrap_err();

    assert!(matches!(err, CollectError::Cancelled));
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn test_shutdown_mid_player_is_not_retried() {
    let dir = TempDir::new().unwrap();
    let shutdown = ShutdownCoordinator::shared();
    // Shutdown lands while player B is half done
    let fetcher = Arc::new(
        ScriptedFetcher::new(&[PLAYER_A, PLAYER_B]).shutdown_after(3, shutdown.clone()),
    );

    let mut collector = Collector::new(fetcher.clone(), job(&dir, ResumeGranularity::Entity))
        .unwrap()
        .with_shutdown(shutdown.clone());
    let err = Supervisor::new(RetryPolicy::immediate(5))
        .with_shutdown(shutdown)
        .run(&mut collector)
        .await
        .unwrap_err();

    assert!(matches!(err, CollectError::Cancelled));
    assert_eq!(fetcher.calls().len(), 3);
    assert!(collector.checkpoints().exists(EntityId::new(PLAYER_A)));
    assert!(!collector.checkpoints().exists(EntityId::new(PLAYER_B)));
}

#[tokio::test]
async fn test_backoff_is_applied_between_attempts() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new(&[PLAYER_A]).fail_once(PLAYER_A, 2014));
    let policy = RetryPolicy {
        max_attempts: 2,
        initial_backoff: std::time::Duration::from_millis(50),
        max_backoff: std::time::Duration::from_millis(50),
        jitter: std::time::Duration::ZERO,
    };

    let mut collector = Collector::new(fetcher.clone(), job(&dir, ResumeGranularity::Entity)).unwrap();
    let started = std::time::Instant::now();
    let summary = Supervisor::new(policy).run(&mut collector).await.unwrap();

    assert!(started.elapsed() >= std::time::Duration::from_millis(50));
    assert_eq!(summary.entities_fetched, 1);
    let aggregate = read_table(&summary.aggregate_path).unwrap();
    assert_eq!(aggregate.len(), 4);
}
