//! Trailing-edge debounce on the tokio timer

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Runs the most recent scheduled action once the quiet period has elapsed
///
/// Every call to [`Debouncer::schedule`] aborts the pending action before
/// arming a new timer, so at most one action is ever waiting.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `action` after the quiet period unless another call supersedes it
    pub fn schedule<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let deadline = Instant::now() + self.delay;
        let mut pending = self.pending.lock();
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            action.await;
        }));
    }

    /// Drop the waiting action, if any
    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().take() {
            previous.abort();
        }
    }

    /// Whether an action is armed and has not finished
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        // Only the last clone tears down the pending action
        if Arc::strong_count(&self.pending) == 1 {
            self.cancel();
        }
    }
}
