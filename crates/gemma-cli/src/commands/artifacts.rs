//! Archive and chat commands

use crate::args::ArtifactsAction;
use crate::output::CliConsole;
use crate::router::TerminalConsole;
use gemma_core::Preview;
use gemma_core::error::{GemmaError, GemmaResult};

pub async fn route(console: &mut TerminalConsole, action: ArtifactsAction) -> GemmaResult<()> {
    match action {
        ArtifactsAction::List { all } => list(console, all).await,
        ArtifactsAction::Show { id } => show(console, &id).await.map(|_| ()),
    }
}

async fn list(console: &mut TerminalConsole, all: bool) -> GemmaResult<()> {
    let out = CliConsole::new(true);
    out.print_header("Artifacts");
    console.load_artifacts().await?;
    while all && console.archive().has_more() {
        if console.load_more_artifacts().await? == 0 {
            break;
        }
    }

    if console.archive().listing().is_empty() {
        out.warn("No artifacts yet");
    } else if console.archive().has_more() {
        out.info("More artifacts available; use --all to list them");
    }
    Ok(())
}

async fn show(console: &mut TerminalConsole, id: &str) -> GemmaResult<()> {
    match console.preview_artifact(id).await? {
        Preview::Ready(_) => Ok(()),
        Preview::Unavailable {
            artifact_id,
            reason,
        } => Err(GemmaError::not_found_resource(
            format!("{artifact_id}: {reason}"),
            "artifact",
        )),
    }
}

/// Open an artifact and ask one question about it
pub async fn chat(
    console: &mut TerminalConsole,
    artifact: &str,
    message: &str,
) -> GemmaResult<()> {
    show(console, artifact).await?;
    let exchange = console.send_chat(message).await?;
    if exchange.fell_back {
        CliConsole::new(true).warn(&format!(
            "Artifact chat unavailable; answered by the {} endpoint",
            exchange.strategy
        ));
    }
    Ok(())
}
