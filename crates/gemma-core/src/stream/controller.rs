//! Run state machine
//!
//! The controller owns the results buffer of the live run. It never touches the
//! network: the driver hands it events tagged with the generation they belong
//! to, and anything from an older generation or a finished run is dropped.

use super::events::{DoneEvent, StreamEvent};
use crate::config::AnalysisConfig;
use crate::error::GemmaError;
use crate::transcript::ResultItem;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle of a streaming run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Connecting,
    Running,
    Completed,
    Errored,
    Cancelled,
}

impl RunState {
    /// Events are accepted only in these states
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Errored | Self::Cancelled)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Connecting => "Connecting",
            Self::Running => "Running",
            Self::Completed => "Completed",
            Self::Errored => "Error",
            Self::Cancelled => "Stopped",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where the final summary came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummarySource {
    Server,
    /// Built from the buffered results because `done` carried none
    Local,
}

/// One result card's worth of data
#[derive(Debug, Clone, PartialEq)]
pub struct StreamedResult {
    pub index: u32,
    pub response: String,
    pub item: ResultItem,
}

/// What a completed run produced
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub generation: u64,
    pub model: String,
    pub summary: String,
    pub summary_source: SummarySource,
    pub artifact_id: Option<String>,
    pub results: Vec<StreamedResult>,
}

impl RunOutcome {
    /// The backend did not persist the run but there is something worth keeping
    pub fn needs_local_artifact(&self) -> bool {
        self.artifact_id.is_none() && !self.results.is_empty()
    }
}

/// Change produced by applying one event
#[derive(Debug, Clone, PartialEq)]
pub enum RunUpdate {
    Started {
        total: u32,
        message: Option<String>,
    },
    Progress {
        percent: u8,
        label: String,
    },
    ResultAppended {
        result: StreamedResult,
        percent: u8,
    },
    Completed(RunOutcome),
    Failed {
        message: String,
    },
    Cancelled,
}

/// Shared handle that stops whichever run is live
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    token: Arc<Mutex<Option<CancellationToken>>>,
}

impl StopHandle {
    fn install(&self, token: CancellationToken) {
        if let Some(previous) = self.token.lock().replace(token) {
            previous.cancel();
        }
    }

    fn clear(&self) {
        self.token.lock().take();
    }

    /// Cancel the live run's subscription. Returns false when nothing was live.
    pub fn stop(&self) -> bool {
        match self.token.lock().take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_live(&self) -> bool {
        self.token.lock().is_some()
    }
}

/// State machine for one run at a time
#[derive(Debug)]
pub struct RunController {
    state: RunState,
    generation: u64,
    total: u32,
    percent: u8,
    label: String,
    results: Vec<StreamedResult>,
    outcome: Option<RunOutcome>,
    last_error: Option<String>,
    stop: StopHandle,
    summary_items: usize,
    snippet_chars: usize,
}

impl Default for RunController {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl RunController {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            state: RunState::Idle,
            generation: 0,
            total: 0,
            percent: 0,
            label: String::new(),
            results: Vec::new(),
            outcome: None,
            last_error: None,
            stop: StopHandle::default(),
            summary_items: config.summary_fallback_items,
            snippet_chars: config.summary_snippet_chars,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn results(&self) -> &[StreamedResult] {
        &self.results
    }

    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Start a new run: Idle -> Connecting
    ///
    /// Any previous subscription is cancelled first, so at most one channel is
    /// live. Returns the new generation and the token its driver must watch.
    pub fn begin(&mut self) -> (u64, CancellationToken) {
        let token = CancellationToken::new();
        self.stop.install(token.clone());

        self.generation += 1;
        self.state = RunState::Connecting;
        self.total = 0;
        self.percent = 0;
        self.label = "Connecting...".to_string();
        self.results.clear();
        self.outcome = None;
        self.last_error = None;

        info!(run_generation = self.generation, "Run connecting");
        (self.generation, token)
    }

    fn accepts(&self, generation: u64) -> bool {
        generation == self.generation && self.state.is_active()
    }

    /// Apply one event from run `generation`
    pub fn apply(&mut self, generation: u64, event: StreamEvent) -> Option<RunUpdate> {
        if !self.accepts(generation) {
            debug!(
                run_generation = generation,
                current_generation = self.generation,
                state = %self.state,
                "Dropping late stream event"
            );
            return None;
        }

        let update = match event {
            StreamEvent::Meta(meta) => {
                self.state = RunState::Running;
                self.total = if meta.total > 0 {
                    meta.total
                } else {
                    meta.max_statements
                };
                self.label = meta
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("Analyzing {} statements", self.total));
                info!(run_generation = generation, total = self.total, "Run started");
                RunUpdate::Started {
                    total: self.total,
                    message: meta.message,
                }
            }
            StreamEvent::Step(step) => {
                self.state = RunState::Running;
                let total = self.effective_total(step.total);
                self.percent = step_percent(step.index, total);
                self.label = match step.fragment.as_deref().filter(|f| !f.trim().is_empty()) {
                    Some(fragment) => format!("{}/{} {}", step.index, total, fragment.trim()),
                    None if step.status.is_empty() => {
                        format!("Analyzing statement {}/{}", step.index, total)
                    }
                    None => format!("{}/{} {}", step.index, total, step.status),
                };
                RunUpdate::Progress {
                    percent: self.percent,
                    label: self.label.clone(),
                }
            }
            StreamEvent::Result(result) => {
                self.state = RunState::Running;
                let total = self.effective_total(result.total);
                self.percent = result_percent(result.index, total);
                self.label = format!("Completed {}/{}", result.index, total);
                let streamed = StreamedResult {
                    index: result.index,
                    response: result.response,
                    item: result.item,
                };
                self.results.push(streamed.clone());
                RunUpdate::ResultAppended {
                    result: streamed,
                    percent: self.percent,
                }
            }
            StreamEvent::Done(done) => RunUpdate::Completed(self.complete(done)),
            StreamEvent::ServerError { detail } => {
                self.fail_with(generation, detail.clone());
                RunUpdate::Failed { message: detail }
            }
        };

        Some(update)
    }

    /// Transport failure on run `generation`
    ///
    /// Ignored once the run has completed, so a connection dropping right after
    /// `done` is not reported as an error.
    pub fn fail(&mut self, generation: u64, error: &GemmaError) -> Option<RunUpdate> {
        if !self.accepts(generation) {
            debug!(
                run_generation = generation,
                state = %self.state,
                error = %error,
                "Ignoring stream error outside a live run"
            );
            return None;
        }
        let message = error.user_message();
        self.fail_with(generation, message.clone());
        Some(RunUpdate::Failed { message })
    }

    /// The channel closed without `done` or an error event
    pub fn finish_without_done(&mut self, generation: u64) -> Option<RunUpdate> {
        self.fail(
            generation,
            &GemmaError::stream("stream closed before the analysis finished"),
        )
    }

    /// User-initiated stop: Running -> Cancelled
    pub fn cancel(&mut self) -> Option<RunUpdate> {
        if !self.state.is_active() {
            return None;
        }
        self.stop.stop();
        self.state = RunState::Cancelled;
        self.label = "Analysis stopped".to_string();
        info!(
            run_generation = self.generation,
            results = self.results.len(),
            "Run cancelled"
        );
        Some(RunUpdate::Cancelled)
    }

    /// Terminal -> Idle. The results buffer stays readable until the next run.
    pub fn reset(&mut self) {
        if self.state.is_terminal() {
            self.state = RunState::Idle;
        }
    }

    fn effective_total(&mut self, event_total: u32) -> u32 {
        if event_total > 0 {
            self.total = event_total;
        }
        self.total
    }

    fn complete(&mut self, done: DoneEvent) -> RunOutcome {
        let (summary, summary_source) = match done.summary.filter(|s| !s.trim().is_empty()) {
            Some(summary) => (summary, SummarySource::Server),
            None => {
                warn!(
                    run_generation = self.generation,
                    degraded = true,
                    results = self.results.len(),
                    "Server sent no summary; building one from buffered results"
                );
                (
                    synthesize_summary(&self.results, self.summary_items, self.snippet_chars),
                    SummarySource::Local,
                )
            }
        };

        self.state = RunState::Completed;
        self.percent = 100;
        self.label = "Analysis complete".to_string();
        self.stop.clear();

        let outcome = RunOutcome {
            generation: self.generation,
            model: done.model,
            summary,
            summary_source,
            artifact_id: done.artifact_id.filter(|id| !id.is_empty()),
            results: self.results.clone(),
        };
        info!(
            run_generation = self.generation,
            results = outcome.results.len(),
            artifact_id = outcome.artifact_id.as_deref().unwrap_or("-"),
            "Run completed"
        );
        self.outcome = Some(outcome.clone());
        outcome
    }

    fn fail_with(&mut self, generation: u64, message: String) {
        warn!(run_generation = generation, error = %message, "Run failed");
        self.state = RunState::Errored;
        self.label = message.clone();
        self.last_error = Some(message);
        self.stop.clear();
    }
}

fn step_percent(index: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let done = u64::from(index.saturating_sub(1));
    (done * 100 / u64::from(total)).min(100) as u8
}

fn result_percent(index: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let (index, total) = (u64::from(index), u64::from(total));
    ((index * 200 + total) / (total * 2)).min(100) as u8
}

/// Bullet list over the first `max_items` results, each snippet cut to `max_chars`
pub fn synthesize_summary(results: &[StreamedResult], max_items: usize, max_chars: usize) -> String {
    if results.is_empty() {
        return "No statements were analyzed.".to_string();
    }

    let mut lines = vec![format!(
        "Local summary of {} analyzed statement{}:",
        results.len(),
        if results.len() == 1 { "" } else { "s" }
    )];
    for result in results.iter().take(max_items) {
        let source = if result.response.trim().is_empty() {
            &result.item.text
        } else {
            &result.response
        };
        lines.push(format!(
            "- {}: {}",
            result.item.speaker,
            truncate_chars(source.trim(), max_chars)
        ));
    }
    if results.len() > max_items {
        lines.push(format!("- ... {} more", results.len() - max_items));
    }
    lines.join("\n")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod percent_tests {
    use super::*;

    #[test]
    fn test_step_percent_uses_floor_of_completed_statements() {
        assert_eq!(step_percent(1, 3), 0);
        assert_eq!(step_percent(2, 3), 33);
        assert_eq!(step_percent(3, 3), 66);
        assert_eq!(step_percent(4, 0), 0);
    }

    #[test]
    fn test_result_percent_rounds_and_caps() {
        assert_eq!(result_percent(1, 3), 33);
        assert_eq!(result_percent(2, 3), 67);
        assert_eq!(result_percent(3, 3), 100);
        assert_eq!(result_percent(5, 3), 100);
        assert_eq!(result_percent(1, 0), 0);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé...");
        assert_eq!(truncate_chars("ok", 5), "ok");
    }
}
