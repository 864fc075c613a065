//! Resume capability for collection runs
//!
//! Two persistence layers decide what a restarted run may skip:
//! - [`CheckpointStore`]: one immutable CSV per fully collected player
//! - [`WorkUnitJournal`]: per-season results of a player still in flight
//!   (only with [`ResumeGranularity::WorkUnit`])

use std::fmt;
use std::str::FromStr;

pub mod checkpoint;
pub mod journal;

pub use checkpoint::CheckpointStore;
pub use journal::{JournalEntry, WorkUnitJournal};

/// Unit of work a restarted run can skip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumeGranularity {
    /// Skip only players with a checkpoint; partial progress is refetched
    #[default]
    Entity,
    /// Also skip seasons already journaled for an unfinished player
    WorkUnit,
}

impl fmt::Display for ResumeGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity => write!(f, "entity"),
            Self::WorkUnit => write!(f, "work-unit"),
        }
    }
}

impl FromStr for ResumeGranularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "entity" | "player" => Ok(Self::Entity),
            "work-unit" | "work_unit" | "season" => Ok(Self::WorkUnit),
            other => Err(format!(
                "unknown resume granularity '{other}' (expected 'entity' or 'work-unit')"
            )),
        }
    }
}

/// Resume errors
#[derive(Debug, thiserror::Error)]
pub enum ResumeError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Checkpoint could not be read or written
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] crate::output::OutputError),

    /// Checkpoint already exists and is immutable
    #[error("checkpoint for player {0} already committed")]
    AlreadyCommitted(crate::identifier::EntityId),

    /// Journal line could not be serialized
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Journal line could not be parsed
    #[error("deserialization error: {0}")]
    DeserializationError(String),

    /// Journal written by an incompatible version
    #[error("schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch {
        /// Expected schema version
        expected: String,
        /// Found schema version
        found: String,
    },

    /// Lock error
    #[error("lock error: {0}")]
    LockError(String),
}
