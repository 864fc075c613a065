//! `verify` command
//!
//! Reads back every checkpoint and journal under the output directory.
//! Any unreadable file fails the command. A truncated final journal line is
//! trimmed exactly as a collection run would trim it.

use clap::Args;
use std::path::Path;
use tracing::{error, info};

use super::{Cli, CliError, OutputFormat};
use crate::identifier::EntityId;
use crate::output::OutputLayout;
use crate::resume::{CheckpointStore, WorkUnitJournal};
use crate::roster::Roster;
use crate::SeasonType;

/// Arguments of `verify`
#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    /// Season type whose checkpoints are checked
    #[arg(long, default_value_t = SeasonType::RegularSeason)]
    pub season_type: SeasonType,
}

/// Verification findings
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    /// Checkpoints read successfully
    pub checkpoints_ok: usize,
    /// Rows across readable checkpoints
    pub checkpoint_rows: usize,
    /// Journals read successfully
    pub journals_ok: usize,
    /// Whether a roster file was present and readable
    pub roster_players: Option<usize>,
    /// Human-readable problems, one per bad file
    pub problems: Vec<String>,
}

impl VerifyArgs {
    /// Execute the command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let report = verify_output_dir(&cli.output_dir, self.season_type)?;

        match cli.output_format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "checkpoints": report.checkpoints_ok,
                    "rows": report.checkpoint_rows,
                    "journals": report.journals_ok,
                    "roster_players": report.roster_players,
                    "problems": report.problems,
                });
                println!("{value}");
            }
            OutputFormat::Human => {
                println!(
                    "{} checkpoints ({} rows), {} journals",
                    report.checkpoints_ok, report.checkpoint_rows, report.journals_ok
                );
                match report.roster_players {
                    Some(players) => println!("Roster: {players} players"),
                    None => println!("Roster: not present"),
                }
                for problem in &report.problems {
                    println!("  ! {problem}");
                }
            }
        }

        if report.problems.is_empty() {
            info!("Verification passed");
            Ok(())
        } else {
            Err(CliError::VerificationFailed(format!(
                "{} unreadable file(s)",
                report.problems.len()
            )))
        }
    }
}

/// Check every file under `root` for `season_type`
pub fn verify_output_dir(root: &Path, season_type: SeasonType) -> Result<VerifyReport, CliError> {
    let mut report = VerifyReport::default();

    let roster_path = OutputLayout::reference_path_in(root);
    if roster_path.is_file() {
        match Roster::load(&roster_path) {
            Ok(roster) => report.roster_players = Some(roster.len()),
            Err(e) => report.problems.push(format!("{}: {e}", roster_path.display())),
        }
    }

    let checkpoint_dir = OutputLayout::checkpoint_dir_in(root, season_type);
    let store = CheckpointStore::new(&checkpoint_dir);
    for id in store.completed()? {
        match store.load(id) {
            Ok(table) => {
                report.checkpoints_ok += 1;
                report.checkpoint_rows += table.len();
            }
            Err(e) => {
                error!(player = %id, error = %e, "Unreadable checkpoint");
                report
                    .problems
                    .push(format!("{}: {e}", store.path_for(id).display()));
            }
        }
    }

    let journal_dir = OutputLayout::journal_dir_in(root, season_type);
    let journal = WorkUnitJournal::new(&journal_dir);
    for id in journal_ids(&journal_dir)? {
        match journal.load(id, season_type) {
            Ok(_) => report.journals_ok += 1,
            Err(e) => {
                error!(player = %id, error = %e, "Unreadable journal");
                report
                    .problems
                    .push(format!("{}: {e}", journal.path_for(id).display()));
            }
        }
    }

    Ok(report)
}

fn journal_ids(dir: &Path) -> Result<Vec<EntityId>, CliError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(CliError::ConfigurationError(e.to_string())),
    };

    let mut ids: Vec<EntityId> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("jsonl"))
        .filter_map(|path| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| EntityId::parse(s).ok())
        })
        .collect();
    ids.sort();
    Ok(ids)
}
