//! # NBA Game Log Collector
//!
//! Resumable bulk collection of per-player game logs from a public
//! basketball statistics API, persisted as CSV.
//!
//! ## Features
//!
//! - **Resumable**: one checkpoint file per player; completed players are never re-fetched
//! - **Bounded restarts**: failed runs restart with exponential backoff up to a fixed attempt count
//! - **Request spacing**: windowed rate limiting plus randomized pacing between fetches
//! - **Work-unit journal**: optional per-season journal shrinks the re-fetch after a crash
//! - **Aggregate output**: every player's rows unioned into one CSV at the end of a run
//!
//! ## Quick Start
//!
//! ```no_run
//! use gamelog_collector::collector::{CollectionJob, Collector, Supervisor, RetryPolicy};
//! use gamelog_collector::fetcher::nba_stats::NbaStatsFetcher;
//! use gamelog_collector::identifier::{Season, SeasonRange};
//! use gamelog_collector::output::OutputLayout;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let seasons = SeasonRange::new(Season::new(2014)?, Season::new(2024)?)?;
//! let job = CollectionJob::new(OutputLayout::new("data", seasons));
//! let fetcher = Arc::new(NbaStatsFetcher::new()?);
//!
//! let mut collector = Collector::new(fetcher, job)?;
//! let summary = Supervisor::new(RetryPolicy::default()).run(&mut collector).await?;
//! println!("{} rows in {}", summary.aggregate_rows, summary.aggregate_path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`identifier`] - Player IDs, seasons and season ranges
//! - [`fetcher`] - The [`fetcher::StatsFetcher`] seam and the stats.nba.com client
//! - [`collector`] - The collection loop, restart supervisor and request scheduling
//! - [`resume`] - Per-player checkpoint files and the per-season journal
//! - [`roster`] - The reference player list, fetched once and never overwritten
//! - [`output`] - CSV tables and the on-disk layout

#![warn(missing_docs)]
#![warn(clippy::all)]

use identifier::{EntityId, Season};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// CLI command implementations
pub mod cli;

/// Collection loop, restart policy and request scheduling
pub mod collector;

/// Stats service clients
pub mod fetcher;

/// Player and season identifiers
pub mod identifier;

/// Observability metrics
pub mod metrics;

/// Data output writers and filesystem layout
pub mod output;

/// Checkpoint and journal persistence
pub mod resume;

/// Reference player list
pub mod roster;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

pub use identifier::SeasonRange;

/// A player on the reference roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Upstream person ID
    pub id: EntityId,
    /// Display name ("First Last")
    pub name: String,
    /// Whether the player is on a current roster
    pub is_active: bool,
    /// Starting year of the first season played, if reported
    pub from_year: Option<u16>,
    /// Starting year of the last season played, if reported
    pub to_year: Option<u16>,
}

impl Entity {
    /// Player with only an ID known (e.g. passed explicitly on the CLI)
    pub fn bare(id: EntityId) -> Self {
        Self {
            id,
            name: String::new(),
            is_active: false,
            from_year: None,
            to_year: None,
        }
    }

    /// Whether the player's career could include any season of `range`
    ///
    /// Players without a reported career span are assumed to overlap.
    pub fn played_during(&self, range: &SeasonRange) -> bool {
        match (self.from_year, self.to_year) {
            (Some(from), Some(to)) => range.overlaps_years(from, to),
            _ => true,
        }
    }
}

/// One fetch task: a player's game log for one season
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkUnit {
    /// Player being fetched
    pub entity: EntityId,
    /// Season being fetched
    pub season: Season,
    /// Regular season, playoffs, ...
    pub season_type: SeasonType,
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player {} {} ({})", self.entity, self.season, self.season_type)
    }
}

/// Portion of the season a game log covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SeasonType {
    /// Regular season games
    #[default]
    #[serde(rename = "Regular Season")]
    RegularSeason,
    /// Playoff games
    #[serde(rename = "Playoffs")]
    Playoffs,
    /// Pre-season games
    #[serde(rename = "Pre Season")]
    PreSeason,
    /// All-Star games
    #[serde(rename = "All Star")]
    AllStar,
}

impl SeasonType {
    /// Value sent as the `SeasonType` query parameter
    pub fn as_query_value(&self) -> &'static str {
        match self {
            SeasonType::RegularSeason => "Regular Season",
            SeasonType::Playoffs => "Playoffs",
            SeasonType::PreSeason => "Pre Season",
            SeasonType::AllStar => "All Star",
        }
    }
}

impl fmt::Display for SeasonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query_value())
    }
}

impl FromStr for SeasonType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], " ").as_str() {
            "regular" | "regular season" => Ok(SeasonType::RegularSeason),
            "playoffs" => Ok(SeasonType::Playoffs),
            "pre" | "pre season" | "preseason" => Ok(SeasonType::PreSeason),
            "all star" | "allstar" => Ok(SeasonType::AllStar),
            _ => Err(format!(
                "Invalid season type: {s}. Valid options: regular, playoffs, preseason, all-star"
            )),
        }
    }
}

/// Tabular result with an externally defined schema
///
/// Cells are kept as text; the collector never interprets them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table, checking every row matches the header width
    ///
    /// Column names must be unique; [`Table::concat`] aligns columns by name.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, String> {
        let mut seen = std::collections::HashSet::with_capacity(headers.len());
        if let Some(duplicate) = headers.iter().find(|h| !seen.insert(h.as_str())) {
            return Err(format!("duplicate column {duplicate:?}"));
        }
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != headers.len())
        {
            return Err(format!(
                "row {index} has {} cells but there are {} headers",
                row.len(),
                headers.len()
            ));
        }
        Ok(Self { headers, rows })
    }

    /// Column names
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column position by name
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Union several tables into one
    ///
    /// Columns are the ordered union of all headers in first-seen order.
    /// Tables missing a column contribute empty cells for it. Row order is
    /// preserved and no row is dropped or duplicated.
    ///
    /// # Examples
    ///
    /// ```
    /// use gamelog_collector::Table;
    ///
    /// let a = Table::new(vec!["ID".into(), "PTS".into()], vec![vec!["1".into(), "30".into()]]).unwrap();
    /// let b = Table::new(vec!["ID".into(), "AST".into()], vec![vec!["2".into(), "9".into()]]).unwrap();
    /// let all = Table::concat([a, b]);
    /// assert_eq!(all.headers(), ["ID", "PTS", "AST"]);
    /// assert_eq!(all.rows()[1], vec!["2", "", "9"]);
    /// ```
    pub fn concat<I>(tables: I) -> Self
    where
        I: IntoIterator<Item = Table>,
    {
        let tables: Vec<Table> = tables.into_iter().collect();

        let mut headers: Vec<String> = Vec::new();
        for table in &tables {
            for header in &table.headers {
                if !headers.contains(header) {
                    headers.push(header.clone());
                }
            }
        }

        let total_rows = tables.iter().map(Table::len).sum();
        let mut rows: Vec<Vec<String>> = Vec::with_capacity(total_rows);
        for table in tables {
            if table.headers == headers {
                rows.extend(table.rows);
                continue;
            }
            let positions: Vec<Option<usize>> =
                headers.iter().map(|h| table.column(h)).collect();
            for mut row in table.rows {
                let aligned: Vec<String> = positions
                    .iter()
                    .map(|pos| match pos {
                        Some(i) => std::mem::take(&mut row[*i]),
                        None => String::new(),
                    })
                    .collect();
                rows.push(aligned);
            }
        }

        Self { headers, rows }
    }
}
