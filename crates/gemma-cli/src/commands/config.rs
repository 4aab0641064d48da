//! Configuration management commands

use crate::args::ConfigAction;
use crate::output::CliConsole;
use gemma_core::config::{ConsoleConfig, save_to_file};
use gemma_core::error::{GemmaError, GemmaResult};
use std::path::Path;

pub fn route(action: ConfigAction, config_file: &str, config: &ConsoleConfig) -> GemmaResult<()> {
    match action {
        ConfigAction::Show => show(config_file, config),
        ConfigAction::Init { force } => init(config_file, force),
    }
}

/// Show the resolved configuration (file, then environment overrides)
fn show(config_file: &str, config: &ConsoleConfig) -> GemmaResult<()> {
    let console = CliConsole::new(true);
    console.print_header("Configuration");

    if Path::new(config_file).exists() {
        console.success(&format!("Loaded configuration from: {config_file}"));
    } else {
        console.warn(&format!("Configuration file not found: {config_file}"));
        console.info("Using defaults and environment overrides");
    }

    console.print_field("Base URL", &config.api.base_url);
    console.print_field("Request timeout", format!("{}s", config.api.request_timeout_secs));
    console.print_field("Count debounce", format!("{}ms", config.analysis.debounce_ms));
    console.print_field("Default max statements", config.analysis.default_max_statements);
    console.print_field("Default page size", config.analysis.default_page_size);
    console.print_field("Recent window", config.analysis.fallback_recent_min);
    console.print_field("Local artifacts kept", config.archive.local_capacity);
    console.print_field("Chat history limit", config.archive.chat_history_limit);
    console.print_field(
        "Logging",
        format!("{} ({})", config.logging.level, config.logging.format),
    );

    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

/// Write a default configuration file
fn init(config_file: &str, force: bool) -> GemmaResult<()> {
    let console = CliConsole::new(true);
    console.print_header("Configuration Initialization");

    let path = Path::new(config_file);
    if path.exists() && !force {
        console.error(&format!("Configuration file already exists: {config_file}"));
        console.info("Use --force to overwrite");
        return Err(GemmaError::config("Configuration file already exists"));
    }

    save_to_file(&ConsoleConfig::default(), path)?;
    console.success(&format!("Wrote default configuration to: {config_file}"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemma_core::config::load_from_file;
    use tempfile::TempDir;

    #[test]
    fn test_init_refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gemma_config.json");
        let file = path.to_str().unwrap();

        init(file, false).unwrap();
        assert!(init(file, false).is_err());
        init(file, true).unwrap();

        let loaded = load_from_file(&path).unwrap();
        assert_eq!(loaded, ConsoleConfig::default());
    }
}
