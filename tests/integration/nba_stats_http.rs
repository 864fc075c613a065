//! Integration tests for the stats.nba.com client against a mock server

use gamelog_collector::collector::{CollectionJob, Collector, DelayRange, RetryPolicy, Supervisor};
use gamelog_collector::fetcher::nba_stats::NbaStatsFetcher;
use gamelog_collector::fetcher::{FetcherError, StatsFetcher};
use gamelog_collector::identifier::EntityId;
use gamelog_collector::output::csv::read_table;
use gamelog_collector::{SeasonType, WorkUnit};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use crate::support::scripted_fetcher::{layout, season_of};

fn fetcher(server: &MockServer) -> NbaStatsFetcher {
    NbaStatsFetcher::with_base_url(server.uri(), Duration::from_secs(5)).unwrap()
}

fn unit(id: u64, season: u16) -> WorkUnit {
    WorkUnit {
        entity: EntityId::new(id),
        season: season_of(season),
        season_type: SeasonType::RegularSeason,
    }
}

fn game_log_body(player: u64, season_id: &str, games: usize) -> Value {
    let rows: Vec<Value> = (0..games)
        .map(|g| json!([season_id, player, format!("00214{g:05}"), 20 + g, null]))
        .collect();
    json!({
        "resource": "playergamelog",
        "resultSets": [{
            "name": "PlayerGameLog",
            "headers": ["SEASON_ID", "Player_ID", "GAME_ID", "PTS", "PLUS_MINUS"],
            "rowSet": rows
        }]
    })
}

fn roster_body() -> Value {
    json!({
        "resource": "commonallplayers",
        "resultSets": [{
            "name": "CommonAllPlayers",
            "headers": ["PERSON_ID", "DISPLAY_FIRST_LAST", "ROSTERSTATUS", "FROM_YEAR", "TO_YEAR"],
            "rowSet": [
                [2544, "LeBron James", 1, "2003", "2024"],
                [893, "Michael Jordan", 0, "1984", "2002"],
                [201939, "Stephen Curry", 1, "2009", "2024"]
            ]
        }]
    })
}

#[tokio::test]
async fn test_game_log_request_and_parse() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stats/playergamelog"))
        .and(query_param("PlayerID", "2544"))
        .and(query_param("Season", "2014-15"))
        .and(query_param("SeasonType", "Regular Season"))
        .and(query_param("LeagueID", "00"))
        .and(header("x-nba-stats-origin", "stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(game_log_body(2544, "22014", 3)))
        .expect(1)
        .mount(&server)
        .await;

    let table = fetcher(&server).fetch_game_log(&unit(2544, 2014)).await.unwrap();

    assert_eq!(table.len(), 3);
    assert_eq!(table.headers()[2], "GAME_ID");
    assert_eq!(table.rows()[0][1], "2544");
    assert_eq!(table.rows()[0][4], "");
}

#[tokio::test]
async fn test_playoff_request_sends_season_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stats/playergamelog"))
        .and(query_param("SeasonType", "Playoffs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(game_log_body(2544, "42014", 0)))
        .expect(1)
        .mount(&server)
        .await;

    let playoff = WorkUnit {
        season_type: SeasonType::Playoffs,
        ..unit(2544, 2014)
    };
    let table = fetcher(&server).fetch_game_log(&playoff).await.unwrap();
    assert!(table.is_empty());
    assert_eq!(table.headers().len(), 5);
}

#[tokio::test]
async fn test_rate_limited_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = fetcher(&server).fetch_game_log(&unit(1, 2014)).await.unwrap_err();
    assert!(matches!(err, FetcherError::RateLimitExceeded));
}

#[tokio::test]
async fn test_server_error_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let err = fetcher(&server).fetch_game_log(&unit(1, 2014)).await.unwrap_err();
    match err {
        FetcherError::HttpStatus { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("upstream exploded"));
        }
        other => panic!("expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(game_log_body(1, "22014", 1))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let fetcher =
        NbaStatsFetcher::with_base_url(server.uri(), Duration::from_millis(200)).unwrap();
    let err = fetcher.fetch_game_log(&unit(1, 2014)).await.unwrap_err();
    assert!(matches!(err, FetcherError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn test_missing_result_set() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resultSets": []})))
        .mount(&server)
        .await;

    let err = fetcher(&server).fetch_game_log(&unit(1, 2014)).await.unwrap_err();
    assert!(matches!(err, FetcherError::MissingResultSet(_)));
}

#[tokio::test]
async fn test_roster_parse() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stats/commonallplayers"))
        .and(query_param("IsOnlyCurrentSeason", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(roster_body()))
        .mount(&server)
        .await;

    let roster = fetcher(&server).list_entities().await.unwrap();
    assert_eq!(roster.len(), 3);
    assert_eq!(roster[0].name, "LeBron James");
    assert!(roster[0].is_active);
    assert!(!roster[1].is_active);
    assert_eq!(roster[1].to_year, Some(2002));
}

#[tokio::test]
async fn test_end_to_end_collection_against_mock_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stats/commonallplayers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(roster_body()))
        .expect(1)
        .mount(&server)
        .await;
    for (player, games) in [(2544u64, 4usize), (201939, 2)] {
        for (season, season_id) in [("2014-15", "22014"), ("2015-16", "22015")] {
            Mock::given(method("GET"))
                .and(path("/stats/playergamelog"))
                .and(query_param("PlayerID", player.to_string()))
                .and(query_param("Season", season))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(game_log_body(player, season_id, games)),
                )
                .expect(1)
                .mount(&server)
                .await;
        }
    }

    let dir = TempDir::new().unwrap();
    let job = CollectionJob::new(layout(dir.path(), 2014, 2015)).with_pacing(DelayRange::none());
    let mut collector = Collector::new(Arc::new(fetcher(&server)), job).unwrap();
    let summary = Supervisor::new(RetryPolicy::immediate(2))
        .run(&mut collector)
        .await
        .unwrap();

    // Jordan retired before 2014 and is filtered out
    assert_eq!(summary.entities_total, 2);
    assert_eq!(summary.fetches, 4);
    assert_eq!(summary.aggregate_rows, 12);
    assert_eq!(read_table(&summary.aggregate_path).unwrap().len(), 12);
}
