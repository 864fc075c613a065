//! Per-season journal for players still in flight
//!
//! Each fetched season is appended as one JSON line to
//! `{journal_dir}/{player}.jsonl` before the next fetch starts. When a run
//! restarts, the seasons found there are reused instead of refetched. Once
//! the player's checkpoint is committed the journal is discarded.
//!
//! A crash mid-append can leave a truncated final line; it is dropped with a
//! warning and that season is simply fetched again.

use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::ResumeError;
use crate::identifier::{EntityId, Season};
use crate::output::OutputLayout;
use crate::{SeasonType, Table, WorkUnit};

/// Current journal line schema version
const SCHEMA_VERSION: &str = "1.0.0";

/// One journaled season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    schema_version: String,
    entity: EntityId,
    season: Season,
    season_type: SeasonType,
    table: Table,
    fetched_at: i64,
}

impl JournalEntry {
    /// Entry for a freshly fetched unit
    pub fn new(unit: &WorkUnit, table: Table) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            entity: unit.entity,
            season: unit.season,
            season_type: unit.season_type,
            table,
            fetched_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Player ID
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Season
    pub fn season(&self) -> Season {
        self.season
    }

    /// Season type
    pub fn season_type(&self) -> SeasonType {
        self.season_type
    }

    /// Fetched rows
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Fetch time (Unix millis)
    pub fn fetched_at(&self) -> i64 {
        self.fetched_at
    }
}

/// Directory of per-player journals
#[derive(Debug, Clone)]
pub struct WorkUnitJournal {
    dir: PathBuf,
}

impl WorkUnitJournal {
    /// Journal rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Journal at the layout's journal directory
    pub fn for_layout(layout: &OutputLayout) -> Self {
        Self::new(layout.journal_dir())
    }

    /// Journal file of `id`
    pub fn path_for(&self, id: EntityId) -> PathBuf {
        self.dir.join(format!("{id}.jsonl"))
    }

    /// Durably append one fetched season
    pub fn append(&self, unit: &WorkUnit, table: &Table) -> Result<(), ResumeError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| ResumeError::IoError(e.to_string()))?;

        let entry = JournalEntry::new(unit, table.clone());
        let mut line = serde_json::to_string(&entry)
            .map_err(|e| ResumeError::SerializationError(e.to_string()))?;
        line.push('\n');

        let path = self.path_for(unit.entity);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| ResumeError::IoError(format!("Failed to open journal: {e}")))?;

        let mut lock = RwLock::new(file);
        let mut guard = lock
            .write()
            .map_err(|e| ResumeError::LockError(format!("Failed to acquire write lock: {e}")))?;

        // A crash can leave a complete entry without its newline
        if ends_unterminated(&mut guard)
            .map_err(|e| ResumeError::IoError(format!("Failed to inspect journal: {e}")))?
        {
            warn!(player = %unit.entity, "Terminating unfinished journal line");
            line.insert(0, '\n');
        }

        guard
            .write_all(line.as_bytes())
            .map_err(|e| ResumeError::IoError(format!("Failed to append to journal: {e}")))?;
        guard
            .flush()
            .map_err(|e| ResumeError::IoError(format!("Failed to flush journal: {e}")))?;
        guard
            .sync_data()
            .map_err(|e| ResumeError::IoError(format!("Failed to sync journal: {e}")))?;

        debug!(
            player = %unit.entity,
            season = %unit.season,
            rows = table.len(),
            "Journaled work unit"
        );
        Ok(())
    }

    /// Seasons journaled for `id` with `season_type`, keyed by season
    ///
    /// A missing journal yields an empty map.
    pub fn load(
        &self,
        id: EntityId,
        season_type: SeasonType,
    ) -> Result<BTreeMap<Season, Table>, ResumeError> {
        let path = self.path_for(id);
        let contents = match read_locked(&path)? {
            Some(contents) => contents,
            None => return Ok(BTreeMap::new()),
        };

        let lines: Vec<&str> = contents.lines().filter(|l| !l.trim().is_empty()).collect();
        let mut seasons = BTreeMap::new();

        for (index, line) in lines.iter().enumerate() {
            let entry: JournalEntry = match serde_json::from_str(line) {
                Ok(entry) => entry,
                Err(e) if index + 1 == lines.len() => {
                    warn!(
                        player = %id,
                        error = %e,
                        "Dropping truncated final journal line"
                    );
                    truncate_last_line(&path, &contents)?;
                    break;
                }
                Err(e) => return Err(ResumeError::DeserializationError(e.to_string())),
            };

            if entry.schema_version != SCHEMA_VERSION {
                warn!(
                    found_version = %entry.schema_version,
                    expected_version = SCHEMA_VERSION,
                    "Journal schema version mismatch"
                );
                return Err(ResumeError::SchemaVersionMismatch {
                    expected: SCHEMA_VERSION.to_string(),
                    found: entry.schema_version,
                });
            }

            if entry.entity != id || entry.season_type != season_type {
                debug!(player = %id, season = %entry.season, "Skipping foreign journal entry");
                continue;
            }

            seasons.insert(entry.season, entry.table);
        }

        if !seasons.is_empty() {
            info!(player = %id, seasons = seasons.len(), "Recovered journaled seasons");
        }
        Ok(seasons)
    }

    /// Remove the journal of `id`; a missing journal is not an error
    pub fn discard(&self, id: EntityId) -> Result<(), ResumeError> {
        match std::fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ResumeError::IoError(format!("Failed to remove journal: {e}"))),
        }
    }
}

/// Cut the final line off so later appends start on a fresh line
fn truncate_last_line(path: &Path, contents: &str) -> Result<(), ResumeError> {
    let keep = contents
        .trim_end_matches(['\n', '\r'])
        .rfind('\n')
        .map(|i| i + 1)
        .unwrap_or(0);

    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|e| ResumeError::IoError(format!("Failed to open journal: {e}")))?;
    let mut lock = RwLock::new(file);
    let guard = lock
        .write()
        .map_err(|e| ResumeError::LockError(format!("Failed to acquire write lock: {e}")))?;
    guard
        .set_len(keep as u64)
        .map_err(|e| ResumeError::IoError(format!("Failed to truncate journal: {e}")))
}

/// Whether the file is non-empty and its last byte is not a newline
fn ends_unterminated(file: &mut std::fs::File) -> std::io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

fn read_locked(path: &Path) -> Result<Option<String>, ResumeError> {
    let file = match OpenOptions::new().read(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ResumeError::IoError(format!("Failed to open journal: {e}"))),
    };

    let lock = RwLock::new(file);
    let guard = lock
        .read()
        .map_err(|e| ResumeError::LockError(format!("Failed to acquire read lock: {e}")))?;

    let mut contents = String::new();
    (&*guard)
        .read_to_string(&mut contents)
        .map_err(|e| ResumeError::IoError(format!("Failed to read journal: {e}")))?;
    Ok(Some(contents))
}
