//! Integration tests for a single collection pass

use gamelog_collector::collector::{CollectError, CollectionJob, Collector, DelayRange};
use gamelog_collector::identifier::EntityId;
use gamelog_collector::output::csv::read_table;
use gamelog_collector::resume::{CheckpointStore, ResumeGranularity};
use gamelog_collector::roster::{Roster, RosterFilter};
use gamelog_collector::{Entity, SeasonType};
use std::sync::Arc;
use tempfile::TempDir;

use crate::support::scripted_fetcher::{layout, season_of, ScriptedFetcher};

fn job(dir: &TempDir, start: u16, end: u16) -> CollectionJob {
    CollectionJob::new(layout(dir.path(), start, end)).with_pacing(DelayRange::none())
}

#[tokio::test]
async fn test_fresh_run_writes_checkpoints_and_aggregate() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(
        ScriptedFetcher::new(&[1, 2, 3])
            .games(1, 2014, 5)
            .games(2, 2015, 0)
            .games(3, 2014, 1),
    );

    let mut collector = Collector::new(fetcher.clone(), job(&dir, 2014, 2015)).unwrap();
    let summary = collector.run().await.unwrap();

    // 3 players x 2 seasons
    assert_eq!(fetcher.calls().len(), 6);
    assert_eq!(summary.fetches, 6);
    assert_eq!(summary.entities_total, 3);
    assert_eq!(summary.entities_fetched, 3);
    assert_eq!(summary.entities_resumed, 0);

    let store = collector.checkpoints();
    assert_eq!(
        store.completed().unwrap(),
        vec![EntityId::new(1), EntityId::new(2), EntityId::new(3)]
    );
    assert_eq!(store.load(EntityId::new(1)).unwrap().len(), 5 + 2);
    assert_eq!(store.load(EntityId::new(2)).unwrap().len(), 2);
    assert_eq!(store.load(EntityId::new(3)).unwrap().len(), 1 + 2);

    let aggregate = read_table(&summary.aggregate_path).unwrap();
    assert_eq!(aggregate.len(), 12);
    assert_eq!(summary.aggregate_rows, 12);
    assert!(summary
        .aggregate_path
        .ends_with("all_player_game_logs_2014_2015.csv"));
}

#[tokio::test]
async fn test_aggregate_rows_equal_sum_of_checkpoints() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(
        ScriptedFetcher::new(&[10, 20])
            .games(10, 2016, 3)
            .games(20, 2017, 7),
    );

    let mut collector = Collector::new(fetcher, job(&dir, 2016, 2018)).unwrap();
    let summary = collector.run().await.unwrap();

    let store = collector.checkpoints();
    let per_player: usize = store
        .completed()
        .unwrap()
        .into_iter()
        .map(|id| store.load(id).unwrap().len())
        .sum();
    let outcome_rows: usize = summary.outcomes.iter().map(|o| o.rows()).sum();

    assert_eq!(per_player, summary.aggregate_rows);
    assert_eq!(outcome_rows, summary.aggregate_rows);
    assert_eq!(read_table(&summary.aggregate_path).unwrap().len(), per_player);
}

#[tokio::test]
async fn test_second_run_fetches_nothing() {
    let dir = TempDir::new().unwrap();
    let first = Arc::new(ScriptedFetcher::new(&[1, 2]));
    let first_summary = Collector::new(first.clone(), job(&dir, 2014, 2016))
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(first.calls().len(), 6);

    let second = Arc::new(ScriptedFetcher::new(&[1, 2]));
    let second_summary = Collector::new(second.clone(), job(&dir, 2014, 2016))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(second.calls().is_empty());
    assert_eq!(second.roster_calls(), 0);
    assert_eq!(second_summary.fetches, 0);
    assert_eq!(second_summary.entities_resumed, 2);
    assert!(second_summary.outcomes.iter().all(|o| o.is_resumed()));
    assert_eq!(second_summary.aggregate_rows, first_summary.aggregate_rows);
}

#[tokio::test]
async fn test_failed_player_leaves_no_checkpoint() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new(&[1, 2, 3]).fail_once(2, 2015));

    let mut collector = Collector::new(fetcher.clone(), job(&dir, 2014, 2015)).unwrap();
    let err = collector.run().await.unwrap_err();

    match &err {
        CollectError::FetchFailed { unit, .. } => {
            assert_eq!(unit.entity, EntityId::new(2));
            assert_eq!(unit.season, season_of(2015));
        }
        other => panic!("expected FetchFailed, got {other:?}"),
    }
    assert!(err.is_retryable());

    let store = collector.checkpoints();
    assert!(store.exists(EntityId::new(1)));
    assert!(!store.exists(EntityId::new(2)));
    assert!(!store.exists(EntityId::new(3)));
    // Player 3 never reached
    assert_eq!(fetcher.calls_for(3, 2014), 0);
    assert!(!layout(dir.path(), 2014, 2015).aggregate_path().exists());
}

#[tokio::test]
async fn test_existing_roster_is_reused_unchanged() {
    let dir = TempDir::new().unwrap();
    let layout = layout(dir.path(), 2014, 2014);
    let pinned = Roster::new(vec![Entity {
        id: EntityId::new(77),
        name: "Pinned Player".to_string(),
        is_active: false,
        from_year: Some(2013),
        to_year: Some(2015),
    }]);
    pinned.persist_new(&layout.reference_path()).unwrap();
    let before = std::fs::read(layout.reference_path()).unwrap();

    // Fetcher knows different players; the pinned file wins
    let fetcher = Arc::new(ScriptedFetcher::new(&[1, 2]));
    let summary = Collector::new(fetcher.clone(), job(&dir, 2014, 2014))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(fetcher.roster_calls(), 0);
    assert_eq!(summary.entities_total, 1);
    assert_eq!(fetcher.calls()[0].entity, EntityId::new(77));
    assert_eq!(std::fs::read(layout.reference_path()).unwrap(), before);
}

#[tokio::test]
async fn test_roster_fetched_once_across_runs() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new(&[1]).fail_once(1, 2014));
    let mut collector = Collector::new(fetcher.clone(), job(&dir, 2014, 2014)).unwrap();

    assert!(collector.run().await.is_err());
    collector.run().await.unwrap();

    assert_eq!(fetcher.roster_calls(), 1);
    assert_eq!(Roster::load(&collector.job().layout.reference_path()).unwrap().len(), 1);
}

#[tokio::test]
async fn test_filters_limit_and_order() {
    let dir = TempDir::new().unwrap();
    let mut roster = vec![
        Entity {
            id: EntityId::new(1),
            name: "Retired".to_string(),
            is_active: false,
            from_year: Some(1990),
            to_year: Some(2001),
        },
        Entity {
            id: EntityId::new(2),
            name: "Veteran".to_string(),
            is_active: false,
            from_year: Some(2005),
            to_year: Some(2015),
        },
    ];
    roster.extend((3..=6).map(|id| Entity {
        id: EntityId::new(id),
        name: format!("Active {id}"),
        is_active: true,
        from_year: Some(2012),
        to_year: Some(2024),
    }));
    let fetcher = Arc::new(ScriptedFetcher::with_roster(roster));

    let filter = RosterFilter {
        limit: Some(3),
        ..RosterFilter::default()
    };
    let summary = Collector::new(fetcher.clone(), job(&dir, 2014, 2014).with_filter(filter))
        .unwrap()
        .run()
        .await
        .unwrap();

    // Player 1 retired before 2014; the limit stops after three
    let collected: Vec<EntityId> = summary.outcomes.iter().map(|o| o.entity()).collect();
    assert_eq!(
        collected,
        vec![EntityId::new(2), EntityId::new(3), EntityId::new(4)]
    );
}

#[tokio::test]
async fn test_explicit_ids_bypass_filters() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new(&[1, 2]));
    let filter = RosterFilter {
        ids: vec![EntityId::new(2), EntityId::new(999), EntityId::new(2)],
        active_only: true,
        ..RosterFilter::default()
    };

    let summary = Collector::new(fetcher.clone(), job(&dir, 2014, 2014).with_filter(filter))
        .unwrap()
        .run()
        .await
        .unwrap();

    let collected: Vec<EntityId> = summary.outcomes.iter().map(|o| o.entity()).collect();
    assert_eq!(collected, vec![EntityId::new(2), EntityId::new(999)]);
}

#[tokio::test]
async fn test_season_types_use_separate_checkpoints() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new(&[1]));

    Collector::new(fetcher.clone(), job(&dir, 2014, 2014))
        .unwrap()
        .run()
        .await
        .unwrap();
    let playoffs = Collector::new(
        fetcher.clone(),
        job(&dir, 2014, 2014).with_season_type(SeasonType::Playoffs),
    )
    .unwrap()
    .run()
    .await
    .unwrap();

    // Playoff run must not reuse the regular season checkpoint
    assert_eq!(playoffs.entities_fetched, 1);
    assert_eq!(fetcher.calls().len(), 2);
    assert_eq!(fetcher.calls()[1].season_type, SeasonType::Playoffs);
    assert!(playoffs
        .aggregate_path
        .ends_with("all_player_game_logs_playoffs_2014_2014.csv"));

    let regular = CheckpointStore::for_layout(&layout(dir.path(), 2014, 2014));
    assert_eq!(regular.completed().unwrap(), vec![EntityId::new(1)]);
}

#[tokio::test]
async fn test_work_unit_journal_discarded_after_commit() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new(&[5]));
    let job = job(&dir, 2014, 2016).with_granularity(ResumeGranularity::WorkUnit);
    let journal_dir = job.layout.journal_dir();

    let summary = Collector::new(fetcher, job).unwrap().run().await.unwrap();

    assert_eq!(summary.entities_fetched, 1);
    assert!(!journal_dir.join("5.jsonl").exists());
}

#[tokio::test]
async fn test_invalid_job_rejected() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new(&[1]));
    let filter = RosterFilter {
        limit: Some(0),
        ..RosterFilter::default()
    };

    let result = Collector::new(fetcher, job(&dir, 2014, 2014).with_filter(filter));
    assert!(matches!(result, Err(CollectError::Validation(_))));
}
