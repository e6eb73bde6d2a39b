//! Main entry point for the `turnstile` binary.
//!
//! Runs election and lock simulations against an in-process ensemble.

use std::time::Duration;

use clap::Parser;
use tracing::info;
use turnstile_cli::{Cli, Command, LoggingConfig, init_logging, load_configuration, run_election, run_lock};
use turnstile_coordination::MemoryEnsemble;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _logging_guard = init_logging(&LoggingConfig::from_env())?;
    turnstile_coordination::metrics::init_metrics();

    let config = load_configuration(&cli)?;
    info!(
        prefix = %config.sequence_prefix,
        campaign_timeout_ms = config.campaign_timeout_ms,
        "Configuration loaded"
    );

    let ensemble = MemoryEnsemble::new();
    let report = match cli.command {
        Command::Elect {
            contenders,
            path,
            hold_ms,
            ..
        } => {
            run_election(
                &ensemble,
                &config,
                contenders,
                &path,
                Duration::from_millis(hold_ms),
            )
            .await?
        }
        Command::Lock {
            workers,
            path,
            hold_ms,
        } => run_lock(&ensemble, &config, workers, &path, Duration::from_millis(hold_ms)).await?,
    };

    print!("{}", report);
    Ok(())
}
