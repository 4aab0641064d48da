//! Gemma transcript analyzer CLI
//!
//! A terminal host for the analysis console.
//!
//! ```bash
//! gemma count --speaker customer --emotion anger
//! gemma browse --keyword refund --pages 2
//! gemma run "Why are customers angry?" --max-statements 25
//! gemma artifacts list
//! gemma chat <artifact-id> "Which calls escalated?"
//! ```
//!
//! Logging goes to stderr. `RUST_LOG` overrides the configured level.

mod args;
mod commands;
mod output;
mod router;
mod terminal;

use clap::Parser;
use gemma_core::config::{ConsoleConfig, LoggingConfig, load_config};
use gemma_core::error::GemmaResult;
use std::path::Path;
use tracing_subscriber::EnvFilter;

pub use args::{ArtifactsAction, Cli, Commands, ConfigAction, FilterArgs};

#[tokio::main]
async fn main() -> GemmaResult<()> {
    let cli = Cli::parse();

    // Config errors are reported after logging is up
    let config = load_config(Path::new(&cli.config_file));
    init_logging(
        config
            .as_ref()
            .map(|c| &c.logging)
            .unwrap_or(&LoggingConfig::default()),
        cli.verbose,
    );

    let config: ConsoleConfig = config?;
    router::route(cli, config).await
}

fn init_logging(logging: &LoggingConfig, verbose: bool) {
    if !logging.log_to_console && !verbose {
        return;
    }
    let default_level = if verbose { "debug" } else { logging.level.as_str() };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match logging.format.as_str() {
        "json" => builder.json().init(),
        "pretty" => builder.pretty().init(),
        _ => builder.compact().init(),
    }
}
