//! Reference player list
//!
//! The roster is fetched from the stats service once and written to
//! `all_players.csv`. From then on every run reads that file; it is never
//! refreshed or overwritten, so the set of players a long collection works
//! through stays fixed across restarts.

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::fetcher::{FetcherError, StatsFetcher};
use crate::identifier::{EntityId, SeasonRange};
use crate::Entity;

/// Which roster players a run collects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterFilter {
    /// Collect exactly these players, in this order
    pub ids: Vec<EntityId>,
    /// Only players currently on a roster
    pub active_only: bool,
    /// Only players whose career overlaps the season range
    pub require_overlap: bool,
    /// Stop after this many players
    pub limit: Option<usize>,
}

impl Default for RosterFilter {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            active_only: false,
            require_overlap: true,
            limit: None,
        }
    }
}

/// Ordered list of players
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    entities: Vec<Entity>,
}

impl Roster {
    /// Roster from an in-memory list
    pub fn new(entities: Vec<Entity>) -> Self {
        Self { entities }
    }

    /// All players
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Number of players
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the roster is empty
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of active players
    pub fn active_count(&self) -> usize {
        self.entities.iter().filter(|e| e.is_active).count()
    }

    /// Look up one player
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Read the roster at `path`, fetching and persisting it first if absent
    pub async fn load_or_fetch(
        path: &Path,
        fetcher: &dyn StatsFetcher,
    ) -> Result<Self, RosterError> {
        if path.is_file() {
            return Self::load(path);
        }

        info!(path = %path.display(), "Reference roster missing, fetching");
        let roster = Self::new(fetcher.list_entities().await?);

        match roster.persist_new(path) {
            Ok(()) => Ok(roster),
            // Another process won the race; its file is authoritative
            Err(RosterError::AlreadyExists(_)) => Self::load(path),
            Err(e) => Err(e),
        }
    }

    /// Read a roster file
    pub fn load(path: &Path) -> Result<Self, RosterError> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| RosterError::Csv(format!("Failed to open {}: {e}", path.display())))?;

        let entities = reader
            .deserialize::<Entity>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RosterError::Csv(format!("Failed to read {}: {e}", path.display())))?;

        debug!(path = %path.display(), players = entities.len(), "Loaded reference roster");
        Ok(Self { entities })
    }

    /// Write the roster to `path`, failing if a file is already there
    pub fn persist_new(&self, path: &Path) -> Result<(), RosterError> {
        if path.exists() {
            return Err(RosterError::AlreadyExists(path.display().to_string()));
        }

        let parent_dir = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent_dir).map_err(|e| RosterError::Io(e.to_string()))?;

        let mut temp_file = tempfile::NamedTempFile::new_in(parent_dir)
            .map_err(|e| RosterError::Io(format!("Failed to create temp file: {e}")))?;
        {
            let mut writer = csv::Writer::from_writer(temp_file.as_file_mut());
            for entity in &self.entities {
                writer
                    .serialize(entity)
                    .map_err(|e| RosterError::Csv(format!("Failed to write player: {e}")))?;
            }
            writer
                .flush()
                .map_err(|e| RosterError::Io(format!("Failed to flush roster: {e}")))?;
        }
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| RosterError::Io(format!("Failed to sync temp file: {e}")))?;

        temp_file.persist_noclobber(path).map_err(|e| {
            if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                RosterError::AlreadyExists(path.display().to_string())
            } else {
                RosterError::Io(format!("Failed to persist roster: {}", e.error))
            }
        })?;

        info!(path = %path.display(), players = self.entities.len(), "Reference roster written");
        Ok(())
    }

    /// Players to collect for `seasons`, in roster order
    ///
    /// Explicit IDs bypass the active/overlap filters; IDs missing from the
    /// roster are collected with no metadata.
    pub fn select(&self, filter: &RosterFilter, seasons: &SeasonRange) -> Vec<Entity> {
        let mut seen = HashSet::new();

        let candidates: Vec<Entity> = if filter.ids.is_empty() {
            self.entities
                .iter()
                .filter(|e| !filter.active_only || e.is_active)
                .filter(|e| !filter.require_overlap || e.played_during(seasons))
                .cloned()
                .collect()
        } else {
            filter
                .ids
                .iter()
                .map(|id| {
                    self.get(*id).cloned().unwrap_or_else(|| {
                        warn!(player = %id, "Requested player not on reference roster");
                        Entity::bare(*id)
                    })
                })
                .collect()
        };

        let selected: Vec<Entity> = candidates
            .into_iter()
            .filter(|e| seen.insert(e.id))
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect();

        info!(
            roster = self.entities.len(),
            selected = selected.len(),
            seasons = %seasons,
            "Selected players"
        );
        selected
    }

    /// Write a short human summary
    pub fn write_summary<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        writeln!(
            out,
            "{} players ({} active)",
            self.entities.len(),
            self.active_count()
        )?;
        let first = self.entities.iter().filter_map(|e| e.from_year).min();
        let last = self.entities.iter().filter_map(|e| e.to_year).max();
        if let (Some(first), Some(last)) = (first, last) {
            writeln!(out, "careers span {first}-{last}")?;
        }
        Ok(())
    }
}

/// Roster errors
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    /// Fetching the list failed
    #[error("failed to fetch roster: {0}")]
    Fetch(#[from] FetcherError),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// CSV read or write error
    #[error("CSV error: {0}")]
    Csv(String),

    /// Roster file already exists
    #[error("roster file already exists: {0}")]
    AlreadyExists(String),
}
