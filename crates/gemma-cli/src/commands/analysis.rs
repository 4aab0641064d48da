//! Count, browse and analysis commands

use super::apply_filters;
use crate::args::FilterArgs;
use crate::output::CliConsole;
use crate::router::TerminalConsole;
use gemma_core::error::{GemmaError, GemmaResult};
use gemma_core::{CountStatus, RunState};
use tracing::info;

pub async fn count(console: &mut TerminalConsole, filters: &FilterArgs) -> GemmaResult<()> {
    apply_filters(console, filters)?;
    match console.update_count(false).await {
        CountStatus::Failed { message } => Err(GemmaError::other(message)),
        _ => Ok(()),
    }
}

pub async fn browse(
    console: &mut TerminalConsole,
    filters: &FilterArgs,
    pages: u32,
) -> GemmaResult<()> {
    apply_filters(console, filters)?;
    console.browse().await?;
    for _ in 1..pages.max(1) {
        if console.next_page().await?.is_none() {
            break;
        }
    }
    Ok(())
}

/// Stream an analysis run; Ctrl+C stops it and keeps what arrived
pub async fn run(
    console: &mut TerminalConsole,
    prompt: &str,
    max_statements: Option<u32>,
    filters: &FilterArgs,
) -> GemmaResult<()> {
    prepare(console, prompt, max_statements, filters)?;
    let out = CliConsole::new(false);

    let stop = console.stop_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() && stop.stop() {
            info!("Stop requested from terminal");
        }
    });
    let report = console.run_streaming().await;
    interrupt.abort();
    let report = report?;

    match report.state {
        RunState::Completed => {
            if let Some(id) = report.local_artifact_id {
                out.warn(&format!(
                    "Run was not archived by the server; kept as {id} until this process exits"
                ));
            }
            Ok(())
        }
        RunState::Cancelled => {
            out.warn(&format!(
                "Analysis stopped after {} statements",
                console.result_count()
            ));
            Ok(())
        }
        _ => Err(GemmaError::stream(
            report
                .error
                .unwrap_or_else(|| "Analysis did not complete".to_string()),
        )),
    }
}

pub async fn quick(
    console: &mut TerminalConsole,
    prompt: &str,
    max_statements: Option<u32>,
    filters: &FilterArgs,
) -> GemmaResult<()> {
    prepare(console, prompt, max_statements, filters)?;
    console.quick_analyze().await.map(|_| ())
}

fn prepare(
    console: &mut TerminalConsole,
    prompt: &str,
    max_statements: Option<u32>,
    filters: &FilterArgs,
) -> GemmaResult<()> {
    apply_filters(console, filters)?;
    console.set_prompt(prompt);
    if let Some(n) = max_statements {
        console.set_max_statements(n);
    }
    Ok(())
}
