//! stats.nba.com fetcher
//!
//! Endpoints used:
//! - `/stats/playergamelog`: one player, one season, one season type
//! - `/stats/commonallplayers`: every player the league has on record

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::stats_http::{StatsHttpClient, DEFAULT_REQUEST_TIMEOUT};
use super::stats_parser::StatsParser;
use super::{FetcherResult, StatsFetcher};
use crate::collector::rate_limit::RateLimiter;
use crate::identifier::Season;
use crate::{Entity, Table, WorkUnit};

/// Production host of the stats service
pub const DEFAULT_BASE_URL: &str = "https://stats.nba.com";

/// League ID for the NBA
pub const NBA_LEAGUE_ID: &str = "00";

const GAME_LOG_ENDPOINT: &str = "/stats/playergamelog";
const GAME_LOG_RESULT_SET: &str = "PlayerGameLog";
const ALL_PLAYERS_ENDPOINT: &str = "/stats/commonallplayers";
const ALL_PLAYERS_RESULT_SET: &str = "CommonAllPlayers";

/// Fetcher for the public NBA stats API
pub struct NbaStatsFetcher {
    http: StatsHttpClient,
    league_id: String,
    roster_season: Season,
}

impl NbaStatsFetcher {
    /// Fetcher against the production host with the default timeout
    pub fn new() -> FetcherResult<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Fetcher against a custom host (mirrors, test servers)
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> FetcherResult<Self> {
        Ok(Self {
            http: StatsHttpClient::new(base_url, timeout)?,
            league_id: NBA_LEAGUE_ID.to_string(),
            roster_season: Season::current(),
        })
    }

    /// Share a rate limiter across every request this fetcher makes
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.http = self.http.with_rate_limiter(rate_limiter);
        self
    }

    /// Season whose all-time roster is requested (defaults to the current one)
    pub fn with_roster_season(mut self, season: Season) -> Self {
        self.roster_season = season;
        self
    }
}

#[async_trait]
impl StatsFetcher for NbaStatsFetcher {
    async fn list_entities(&self) -> FetcherResult<Vec<Entity>> {
        let params = [
            ("LeagueID", self.league_id.clone()),
            ("Season", self.roster_season.label()),
            ("IsOnlyCurrentSeason", "0".to_string()),
        ];
        let body = self.http.get_json(ALL_PLAYERS_ENDPOINT, &params).await?;
        let table = StatsParser::parse_result_set(&body, ALL_PLAYERS_RESULT_SET)?;
        let roster = StatsParser::parse_roster(&table)?;

        info!(players = roster.len(), "Fetched reference roster");
        Ok(roster)
    }

    async fn fetch_game_log(&self, unit: &WorkUnit) -> FetcherResult<Table> {
        let params = [
            ("PlayerID", unit.entity.to_string()),
            ("Season", unit.season.label()),
            ("SeasonType", unit.season_type.as_query_value().to_string()),
            ("LeagueID", self.league_id.clone()),
            ("DateFrom", String::new()),
            ("DateTo", String::new()),
        ];
        let body = self.http.get_json(GAME_LOG_ENDPOINT, &params).await?;
        let table = StatsParser::parse_result_set(&body, GAME_LOG_RESULT_SET)?;

        debug!(
            player = %unit.entity,
            season = %unit.season,
            games = table.len(),
            "Fetched game log"
        );
        Ok(table)
    }

    fn base_url(&self) -> &str {
        self.http.base_url()
    }
}
