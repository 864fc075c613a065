//! `roster` command

use clap::Args;
use std::time::Duration;

use super::{Cli, CliError, OutputFormat};
use crate::fetcher::nba_stats::{NbaStatsFetcher, DEFAULT_BASE_URL};
use crate::output::OutputLayout;
use crate::roster::Roster;

/// Arguments of `roster`
#[derive(Args, Debug, Clone)]
pub struct RosterArgs {
    /// Stats service host
    #[arg(long, env = "NBA_STATS_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Per-request timeout (seconds)
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

impl RosterArgs {
    /// Load the reference roster, fetching it once if absent, and summarize it
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let path = OutputLayout::reference_path_in(&cli.output_dir);
        let fetcher = NbaStatsFetcher::with_base_url(
            self.base_url.clone(),
            Duration::from_secs(self.timeout_secs),
        )?;

        let roster = Roster::load_or_fetch(&path, &fetcher).await?;

        match cli.output_format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "path": path.display().to_string(),
                    "players": roster.len(),
                    "active": roster.active_count(),
                });
                println!("{value}");
            }
            OutputFormat::Human => {
                println!("Reference roster: {}", path.display());
                roster
                    .write_summary(std::io::stdout().lock())
                    .map_err(|e| CliError::ConfigurationError(e.to_string()))?;
            }
        }
        Ok(())
    }
}
