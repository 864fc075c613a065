//! Per-player checkpoint files
//!
//! A checkpoint is the complete game log of one player over the configured
//! season range. Its existence alone marks the player as done; it is written
//! once, atomically, and never replaced.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::ResumeError;
use crate::identifier::EntityId;
use crate::output::csv::{read_table, write_table_new};
use crate::output::{OutputError, OutputLayout};
use crate::Table;

/// Directory of per-player checkpoint CSVs
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Store rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store at the layout's checkpoint directory
    pub fn for_layout(layout: &OutputLayout) -> Self {
        Self::new(layout.checkpoint_dir())
    }

    /// Checkpoint directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Checkpoint file of `id`
    pub fn path_for(&self, id: EntityId) -> PathBuf {
        self.dir.join(format!("{id}.csv"))
    }

    /// Whether `id` has been fully collected
    pub fn exists(&self, id: EntityId) -> bool {
        self.path_for(id).is_file()
    }

    /// Read back the checkpoint of `id`
    pub fn load(&self, id: EntityId) -> Result<Table, ResumeError> {
        let path = self.path_for(id);
        let table = read_table(&path)?;
        debug!(player = %id, rows = table.len(), "Loaded checkpoint");
        Ok(table)
    }

    /// Persist the complete game log of `id`
    ///
    /// Fails with [`ResumeError::AlreadyCommitted`] if a checkpoint exists.
    pub fn commit(&self, id: EntityId, table: &Table) -> Result<PathBuf, ResumeError> {
        let path = self.path_for(id);
        write_table_new(&path, table).map_err(|e| match e {
            OutputError::AlreadyExists(_) => ResumeError::AlreadyCommitted(id),
            other => ResumeError::Checkpoint(other),
        })?;

        info!(player = %id, rows = table.len(), path = %path.display(), "Checkpoint committed");
        Ok(path)
    }

    /// Players with a checkpoint on disk, in ascending ID order
    ///
    /// Files whose stem is not a player ID are ignored.
    pub fn completed(&self) -> Result<Vec<EntityId>, ResumeError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ResumeError::IoError(e.to_string())),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| ResumeError::IoError(e.to_string()))?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()).map(EntityId::parse) {
                Some(Ok(id)) => ids.push(id),
                _ => warn!(path = %path.display(), "Ignoring stray file in checkpoint directory"),
            }
        }
        ids.sort();
        Ok(ids)
    }
}
