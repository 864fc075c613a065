//! On-disk layout of a collection run
//!
//! Everything lives under one root directory (default `data/`):
//!
//! ```text
//! data/
//! ├── all_players.csv                          reference roster, written once
//! ├── all_player_game_logs_2014_2024.csv       aggregate, rewritten every run
//! └── player_game_logs/
//!     ├── 201939.csv                           per-player checkpoint
//!     └── .journal/
//!         └── 2544.jsonl                       per-season journal (work-unit mode)
//! ```
//!
//! Season types other than the regular season get suffixed directories and
//! aggregate names (`player_game_logs_playoffs/`,
//! `all_player_game_logs_playoffs_2014_2024.csv`) so runs never mix.

use std::path::{Path, PathBuf};

use super::{OutputError, OutputResult};
use crate::identifier::SeasonRange;
use crate::SeasonType;

const CHECKPOINT_DIR: &str = "player_game_logs";
const JOURNAL_DIR: &str = ".journal";
const REFERENCE_FILE: &str = "all_players.csv";
const AGGREGATE_PREFIX: &str = "all_player_game_logs";

/// Paths used by one collection configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
    seasons: SeasonRange,
    season_type: SeasonType,
}

impl OutputLayout {
    /// Regular-season layout rooted at `root`
    pub fn new(root: impl Into<PathBuf>, seasons: SeasonRange) -> Self {
        Self {
            root: root.into(),
            seasons,
            season_type: SeasonType::default(),
        }
    }

    /// Switch the season type
    pub fn with_season_type(mut self, season_type: SeasonType) -> Self {
        self.season_type = season_type;
        self
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Season range collected
    pub fn seasons(&self) -> SeasonRange {
        self.seasons
    }

    /// Season type collected
    pub fn season_type(&self) -> SeasonType {
        self.season_type
    }

    /// Directory holding one checkpoint CSV per player
    pub fn checkpoint_dir(&self) -> PathBuf {
        Self::checkpoint_dir_in(&self.root, self.season_type)
    }

    /// Checkpoint directory under `root` for `season_type`, whatever the range
    pub fn checkpoint_dir_in(root: impl AsRef<Path>, season_type: SeasonType) -> PathBuf {
        let root = root.as_ref();
        match suffix(season_type) {
            Some(suffix) => root.join(format!("{CHECKPOINT_DIR}_{suffix}")),
            None => root.join(CHECKPOINT_DIR),
        }
    }

    /// Directory holding per-player journals
    pub fn journal_dir(&self) -> PathBuf {
        Self::journal_dir_in(&self.root, self.season_type)
    }

    /// Journal directory under `root` for `season_type`
    pub fn journal_dir_in(root: impl AsRef<Path>, season_type: SeasonType) -> PathBuf {
        Self::checkpoint_dir_in(root, season_type).join(JOURNAL_DIR)
    }

    /// Reference roster file
    pub fn reference_path(&self) -> PathBuf {
        Self::reference_path_in(&self.root)
    }

    /// Reference roster file under `root`
    pub fn reference_path_in(root: impl AsRef<Path>) -> PathBuf {
        root.as_ref().join(REFERENCE_FILE)
    }

    /// Aggregate CSV for the configured range
    pub fn aggregate_path(&self) -> PathBuf {
        let start = self.seasons.start().start_year();
        let end = self.seasons.end().start_year();
        let name = match suffix(self.season_type) {
            Some(suffix) => format!("{AGGREGATE_PREFIX}_{suffix}_{start}_{end}.csv"),
            None => format!("{AGGREGATE_PREFIX}_{start}_{end}.csv"),
        };
        self.root.join(name)
    }

    /// Create the root and checkpoint directories
    pub fn ensure_dirs(&self) -> OutputResult<()> {
        let dir = self.checkpoint_dir();
        std::fs::create_dir_all(&dir).map_err(|e| {
            OutputError::IoError(format!("Failed to create {}: {e}", dir.display()))
        })
    }
}

fn suffix(season_type: SeasonType) -> Option<&'static str> {
    match season_type {
        SeasonType::RegularSeason => None,
        SeasonType::Playoffs => Some("playoffs"),
        SeasonType::PreSeason => Some("preseason"),
        SeasonType::AllStar => Some("allstar"),
    }
}
