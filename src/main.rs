//! Main entry point for the gamelog-collector CLI

use clap::Parser;
use gamelog_collector::cli::{Cli, Commands};
use gamelog_collector::shutdown::{self, ShutdownCoordinator};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gamelog_collector=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    // Install global shutdown coordinator and Ctrl+C handler
    let shutdown = ShutdownCoordinator::shared();
    shutdown::set_global_shutdown(shutdown.clone());
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl+C received - finishing without partial checkpoints...");
                shutdown.request_shutdown();
            }
        }
    });

    let result: anyhow::Result<()> = match &cli.command {
        Commands::Collect(args) => args
            .execute(&cli, shutdown.clone())
            .await
            .map_err(anyhow::Error::from),
        Commands::Roster(args) => args.execute(&cli).await.map_err(anyhow::Error::from),
        Commands::Verify(args) => args.execute(&cli).await.map_err(anyhow::Error::from),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }
}
