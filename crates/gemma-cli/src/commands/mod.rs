//! CLI commands

pub mod analysis;
pub mod artifacts;
pub mod config;

use crate::args::FilterArgs;
use crate::router::TerminalConsole;
use gemma_core::error::{GemmaError, GemmaResult};

/// Copy the filter flags into the console's controls
pub(crate) fn apply_filters(
    console: &mut TerminalConsole,
    filters: &FilterArgs,
) -> GemmaResult<()> {
    filters
        .apply(console.controls_mut())
        .map_err(|e| GemmaError::validation_field(e, "emotion"))
}
