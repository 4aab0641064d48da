//! Pumps an event stream into the controller

use super::controller::{RunController, RunUpdate};
use super::source::EventStream;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Consume `events` for run `generation` until it ends or `token` fires
///
/// Every update the controller accepts is passed to `on_update` in arrival
/// order. A frame that fails to decode is skipped; transport and server errors
/// end the run. Returns after `done` or a server error, when the channel
/// closes, or on cancellation. The stream is dropped on return, which closes
/// the connection.
pub async fn drive_run<F>(
    controller: Arc<Mutex<RunController>>,
    generation: u64,
    mut events: EventStream,
    token: CancellationToken,
    mut on_update: F,
) where
    F: FnMut(RunUpdate) + Send,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(run_generation = generation, "Run subscription cancelled");
                return;
            }
            next = events.next() => next,
        };

        let terminal_event = matches!(&next, Some(Ok(event)) if event.is_terminal());
        let (update, finished) = {
            let mut controller = controller.lock();
            let update = match next {
                Some(Ok(event)) => controller.apply(generation, event),
                Some(Err(error)) if !error.is_run_terminal() => {
                    warn!(
                        run_generation = generation,
                        error = %error,
                        "Skipping undecodable event"
                    );
                    None
                }
                Some(Err(error)) => controller.fail(generation, &error),
                None => controller.finish_without_done(generation),
            };
            let finished = terminal_event
                || controller.generation() != generation
                || !controller.state().is_active();
            (update, finished)
        };

        if let Some(update) = update {
            on_update(update);
        }
        if finished {
            return;
        }
    }
}
