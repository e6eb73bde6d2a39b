//! Command line and configuration loading
//!
//! Settings are layered, later sources winning:
//! 1. built-in defaults of [`CoordinationConfig`]
//! 2. the file named by `--config` (YAML, TOML or JSON by extension)
//! 3. `TURNSTILE_*` environment variables, e.g. `TURNSTILE_SEQUENCE_PREFIX`
//! 4. command line flags

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use config::{Config, Environment, File};
use turnstile_coordination::CoordinationConfig;

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "turnstile", version, about = "Leader election and lock simulations")]
pub struct Cli {
    /// Configuration file
    #[arg(short = 'c', long = "config", env = "TURNSTILE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Prefix of contender node names
    #[arg(long = "prefix")]
    pub sequence_prefix: Option<String>,

    /// Identity written into contender nodes
    #[arg(long = "identity")]
    pub identity: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Campaign for leadership with several sessions; each leader resigns after holding
    Elect {
        #[arg(long, default_value_t = 3)]
        contenders: usize,
        #[arg(long, default_value = "/election/demo")]
        path: String,
        #[arg(long = "hold-ms", default_value_t = 100)]
        hold_ms: u64,
        /// Campaign timeout; overrides `campaign_timeout_ms`
        #[arg(long = "timeout-ms")]
        timeout_ms: Option<u64>,
    },
    /// Contend for a lock with several sessions and report the acquisition order
    Lock {
        #[arg(long, default_value_t = 3)]
        workers: usize,
        #[arg(long, default_value = "/locks/demo")]
        path: String,
        #[arg(long = "hold-ms", default_value_t = 100)]
        hold_ms: u64,
    },
}

/// Load the coordination configuration for `cli` from the process environment.
pub fn load_configuration(cli: &Cli) -> anyhow::Result<CoordinationConfig> {
    build_configuration(cli, None)
}

/// Load the coordination configuration, reading variables from `env` instead
/// of the process environment when given.
pub fn build_configuration(
    cli: &Cli,
    env: Option<config::Map<String, String>>,
) -> anyhow::Result<CoordinationConfig> {
    let mut builder = Config::builder();

    if let Some(path) = &cli.config {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix("TURNSTILE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(env),
    );

    if let Some(prefix) = &cli.sequence_prefix {
        builder = builder.set_override("sequence_prefix", prefix.as_str())?;
    }
    if let Some(identity) = &cli.identity {
        builder = builder.set_override("identity", identity.as_str())?;
    }
    if let Command::Elect {
        timeout_ms: Some(timeout_ms),
        ..
    } = &cli.command
    {
        builder = builder.set_override("campaign_timeout_ms", *timeout_ms)?;
    }

    let config: CoordinationConfig = builder.build()?.try_deserialize()?;
    config.validate()?;
    Ok(config)
}
