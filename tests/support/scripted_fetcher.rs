//! In-memory stats service with scripted failures

#![allow(dead_code)]

use async_trait::async_trait;
use gamelog_collector::fetcher::{FetcherError, FetcherResult, StatsFetcher};
use gamelog_collector::identifier::{EntityId, Season, SeasonRange};
use gamelog_collector::output::OutputLayout;
use gamelog_collector::shutdown::SharedShutdown;
use gamelog_collector::{Entity, Table, WorkUnit};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const GAME_LOG_HEADERS: [&str; 4] = ["SEASON_ID", "Player_ID", "GAME_ID", "PTS"];

/// Fake fetcher recording every call it receives
pub struct ScriptedFetcher {
    roster: Vec<Entity>,
    games: HashMap<(EntityId, Season), usize>,
    default_games: usize,
    fail_once: Mutex<HashSet<(EntityId, Season)>>,
    fail_always: HashSet<EntityId>,
    shutdown_after: Option<(usize, SharedShutdown)>,
    calls: Mutex<Vec<WorkUnit>>,
    roster_calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new(ids: &[u64]) -> Self {
        let roster = ids
            .iter()
            .map(|id| Entity {
                id: EntityId::new(*id),
                name: format!("Player {id}"),
                is_active: true,
                from_year: Some(2010),
                to_year: Some(2024),
            })
            .collect();
        Self::with_roster(roster)
    }

    pub fn with_roster(roster: Vec<Entity>) -> Self {
        Self {
            roster,
            games: HashMap::new(),
            default_games: 2,
            fail_once: Mutex::new(HashSet::new()),
            fail_always: HashSet::new(),
            shutdown_after: None,
            calls: Mutex::new(Vec::new()),
            roster_calls: AtomicUsize::new(0),
        }
    }

    /// Games reported for one player-season
    pub fn games(mut self, id: u64, season: u16, games: usize) -> Self {
        self.games.insert((EntityId::new(id), season_of(season)), games);
        self
    }

    /// Fail the next fetch of this player-season, then succeed
    pub fn fail_once(self, id: u64, season: u16) -> Self {
        self.fail_once
            .lock()
            .unwrap()
            .insert((EntityId::new(id), season_of(season)));
        self
    }

    /// Fail every fetch for this player
    pub fn fail_always(mut self, id: u64) -> Self {
        self.fail_always.insert(EntityId::new(id));
        self
    }

    /// Request shutdown once `calls` fetches have been served
    pub fn shutdown_after(mut self, calls: usize, shutdown: SharedShutdown) -> Self {
        self.shutdown_after = Some((calls, shutdown));
        self
    }

    /// Every game log request, in order
    pub fn calls(&self) -> Vec<WorkUnit> {
        self.calls.lock().unwrap().clone()
    }

    /// Requests for one player-season
    pub fn calls_for(&self, id: u64, season: u16) -> usize {
        let key = (EntityId::new(id), season_of(season));
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|unit| (unit.entity, unit.season) == key)
            .count()
    }

    pub fn roster_calls(&self) -> usize {
        self.roster_calls.load(Ordering::SeqCst)
    }

    fn games_for(&self, unit: &WorkUnit) -> usize {
        self.games
            .get(&(unit.entity, unit.season))
            .copied()
            .unwrap_or(self.default_games)
    }
}

#[async_trait]
impl StatsFetcher for ScriptedFetcher {
    async fn list_entities(&self) -> FetcherResult<Vec<Entity>> {
        self.roster_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.roster.clone())
    }

    async fn fetch_game_log(&self, unit: &WorkUnit) -> FetcherResult<Table> {
        let served = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(*unit);
            calls.len()
        };

        if let Some((after, shutdown)) = &self.shutdown_after {
            if served >= *after {
                shutdown.request_shutdown();
            }
        }

        if self.fail_always.contains(&unit.entity)
            || self
                .fail_once
                .lock()
                .unwrap()
                .remove(&(unit.entity, unit.season))
        {
            return Err(FetcherError::HttpStatus {
                status: 503,
                message: format!("scripted failure for {unit}"),
            });
        }

        Ok(game_log(unit, self.games_for(unit)))
    }

    fn base_url(&self) -> &str {
        "memory://scripted"
    }
}

pub fn season_of(year: u16) -> Season {
    Season::new(year).unwrap()
}

pub fn seasons(start: u16, end: u16) -> SeasonRange {
    SeasonRange::new(season_of(start), season_of(end)).unwrap()
}

pub fn layout(root: &Path, start: u16, end: u16) -> OutputLayout {
    OutputLayout::new(root, seasons(start, end))
}

/// Deterministic game log with `games` rows
pub fn game_log(unit: &WorkUnit, games: usize) -> Table {
    let headers = GAME_LOG_HEADERS.iter().map(|h| h.to_string()).collect();
    let rows = (0..games)
        .map(|game| {
            vec![
                format!("2{}", unit.season.start_year()),
                unit.entity.to_string(),
                format!("{}{:04}{:02}", unit.entity, unit.season.start_year(), game),
                (10 + game).to_string(),
            ]
        })
        .collect();
    Table::new(headers, rows).unwrap()
}
