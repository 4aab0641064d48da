//! Environment variable overrides

use super::model::ConsoleConfig;
use crate::error::{GemmaError, GemmaResult};
use std::env;

/// Apply `GEMMA_*` environment variables on top of `config`
///
/// - `GEMMA_BASE_URL`
/// - `GEMMA_REQUEST_TIMEOUT_SECS`
/// - `GEMMA_DEBOUNCE_MS`
/// - `GEMMA_LOG_LEVEL`
pub fn apply_env_overrides(config: &mut ConsoleConfig) -> GemmaResult<()> {
    apply_overrides(config, |key| env::var(key).ok())
}

fn apply_overrides(
    config: &mut ConsoleConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> GemmaResult<()> {
    if let Some(base_url) = lookup("GEMMA_BASE_URL") {
        config.api.base_url = base_url;
    }

    if let Some(timeout) = lookup("GEMMA_REQUEST_TIMEOUT_SECS") {
        config.api.request_timeout_secs = parse_number(&timeout, "GEMMA_REQUEST_TIMEOUT_SECS")?;
    }

    if let Some(debounce) = lookup("GEMMA_DEBOUNCE_MS") {
        config.analysis.debounce_ms = parse_number(&debounce, "GEMMA_DEBOUNCE_MS")?;
    }

    if let Some(level) = lookup("GEMMA_LOG_LEVEL") {
        config.logging.level = level;
    }

    Ok(())
}

fn parse_number(value: &str, key: &str) -> GemmaResult<u64> {
    value.trim().parse().map_err(|_| {
        GemmaError::config_with_context(
            format!("Invalid {} value", key),
            format!("Parsing '{}' as an unsigned integer", value),
        )
    })
}
