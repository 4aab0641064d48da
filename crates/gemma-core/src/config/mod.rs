//! Console configuration
//!
//! Configuration is resolved in layers: defaults, then an optional file
//! (JSON, TOML or YAML by extension), then `GEMMA_*` environment overrides.

mod env_loader;
mod file_loader;
mod model;

pub use env_loader::apply_env_overrides;
pub use file_loader::{load_from_file, save_to_file};
pub use model::{
    AnalysisConfig, ApiConfig, ArchiveConfig, ConsoleConfig, EndpointPaths, LoggingConfig,
};

use crate::error::GemmaResult;
use std::path::Path;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "gemma_config.json";

/// Load configuration from `path`, apply environment overrides and validate
pub fn load_config(path: &Path) -> GemmaResult<ConsoleConfig> {
    let mut config = load_from_file(path)?;
    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}
