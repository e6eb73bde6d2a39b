//! Turnstile CLI - configuration, logging, and simulations behind the `turnstile` binary

pub mod config;
pub mod logging;
pub mod simulate;

pub use config::{Cli, Command, build_configuration, load_configuration};
pub use logging::{LoggingConfig, LoggingGuard, init_logging};
pub use simulate::{Acquisition, SimulationReport, run_election, run_lock};
