//! Command routing logic for CLI

use crate::args::{Cli, Commands};
use crate::commands;
use crate::terminal::TerminalSurface;
use gemma_core::config::ConsoleConfig;
use gemma_core::error::GemmaResult;
use gemma_core::{AnalyzerConsole, ConsoleServices, FileStore, HttpApi};
use std::sync::Arc;
use tracing::debug;

pub type TerminalConsole = AnalyzerConsole<TerminalSurface>;

/// Route CLI commands to their respective handlers
pub async fn route(cli: Cli, config: ConsoleConfig) -> GemmaResult<()> {
    let verbose = cli.verbose;
    let command = match cli.command {
        Commands::Config { action } => {
            return commands::config::route(action, &cli.config_file, &config);
        }
        command => command,
    };

    let mut console = build_console(config, verbose)?;
    console.mount().await;

    let result = match command {
        Commands::Count { filters } => commands::analysis::count(&mut console, &filters).await,
        Commands::Browse { filters, pages } => {
            commands::analysis::browse(&mut console, &filters, pages).await
        }
        Commands::Run {
            prompt,
            max_statements,
            filters,
        } => commands::analysis::run(&mut console, &prompt, max_statements, &filters).await,
        Commands::Quick {
            prompt,
            max_statements,
            filters,
        } => commands::analysis::quick(&mut console, &prompt, max_statements, &filters).await,
        Commands::Artifacts { action } => commands::artifacts::route(&mut console, action).await,
        Commands::Chat { artifact, message } => {
            commands::artifacts::chat(&mut console, &artifact, &message).await
        }
        Commands::Config { .. } => Ok(()),
    };

    // Best effort; a failed release never changes the exit status
    if let Err(e) = console.shutdown().await {
        debug!(error = %e, "Release task did not finish");
    }
    result
}

fn build_console(config: ConsoleConfig, verbose: bool) -> GemmaResult<TerminalConsole> {
    let api = HttpApi::new(config.api.clone())?;
    let store = Arc::new(FileStore::new()?);
    let services = ConsoleServices::http(api, store);
    Ok(AnalyzerConsole::new(
        config,
        services,
        TerminalSurface::new(verbose),
    ))
}
