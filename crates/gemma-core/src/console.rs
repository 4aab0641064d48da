//! The analyzer console: one context object owning every component
//!
//! Hosts (the CLI, tests) drive the console through its methods or through
//! [`AnalyzerConsole::dispatch`] with the bound selectors. Every failure is
//! either absorbed by a fallback or written to the event log and toasted;
//! nothing leaves a panel in a half-drawn state.

use crate::api::{AnalysisApi, ArchiveApi, HttpApi, QuickAnalysis, TranscriptApi};
use crate::archive::{ArchiveBrowser, Artifact, Preview};
use crate::chat::{ChatExchange, ChatService, ChatSession};
use crate::config::ConsoleConfig;
use crate::error::{ErrorCategory, GemmaError, GemmaResult};
use crate::filter::{Emotion, FilterControls, FilterSpec};
use crate::query::{CountRefresher, CountStatus, QueryStrategy, TranscriptQueryClient};
use crate::store::{KEY_LAST_PROMPT, KEY_MAX_STATEMENTS, KeyValueStore};
use crate::stream::{
    EventSource, MAX_STATEMENTS, RunController, RunOutcome, RunRequest, RunState, RunUpdate,
    StopHandle, drive_run,
};
use crate::transcript::BrowsePage;
use crate::view::{Action, BindingTable, EventLog, Toast, UiEvent, ViewRenderer, ViewSurface};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Backend ports the console talks through
#[derive(Clone)]
pub struct ConsoleServices {
    pub transcripts: Arc<dyn TranscriptApi>,
    pub analysis: Arc<dyn AnalysisApi>,
    pub archive: Arc<dyn ArchiveApi>,
    pub events: Arc<dyn EventSource>,
    pub store: Arc<dyn KeyValueStore>,
}

impl ConsoleServices {
    /// Every port served by one HTTP client
    pub fn http(api: HttpApi, store: Arc<dyn KeyValueStore>) -> Self {
        let api = Arc::new(api);
        Self {
            transcripts: api.clone(),
            analysis: api.clone(),
            archive: api.clone(),
            events: api,
            store,
        }
    }
}

/// How a streaming run ended
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub state: RunState,
    pub outcome: Option<RunOutcome>,
    pub error: Option<String>,
    /// Set when the run was kept as a local artifact
    pub local_artifact_id: Option<String>,
}

pub struct AnalyzerConsole<S: ViewSurface> {
    config: ConsoleConfig,
    services: ConsoleServices,
    controls: FilterControls,
    prompt: String,
    max_statements: u32,
    query: Arc<TranscriptQueryClient>,
    refresher: CountRefresher,
    browse_offset: u32,
    browse_has_more: bool,
    controller: Arc<Mutex<RunController>>,
    archive: ArchiveBrowser,
    chat: ChatService,
    view: ViewRenderer<S>,
    log: EventLog,
    toast: Option<Toast>,
    last_count: CountStatus,
    bindings: BindingTable,
}

impl<S: ViewSurface> AnalyzerConsole<S> {
    pub fn new(config: ConsoleConfig, services: ConsoleServices, surface: S) -> Self {
        let query = Arc::new(TranscriptQueryClient::new(
            services.transcripts.clone(),
            &config.analysis,
        ));
        let refresher = CountRefresher::new(query.clone(), config.analysis.debounce());

        Self {
            controls: FilterControls::with_page_size(config.analysis.default_page_size),
            prompt: String::new(),
            max_statements: config.analysis.default_max_statements,
            refresher,
            query,
            browse_offset: 0,
            browse_has_more: false,
            controller: Arc::new(Mutex::new(RunController::new(&config.analysis))),
            archive: ArchiveBrowser::new(services.archive.clone(), &config.archive),
            chat: ChatService::new(services.archive.clone(), config.archive.chat_history_limit),
            view: ViewRenderer::new(surface),
            log: EventLog::new(config.analysis.event_log_capacity),
            toast: None,
            last_count: CountStatus::Unknown,
            bindings: BindingTable::analyzer(),
            services,
            config,
        }
    }

    /// Wire the bindings, restore saved preferences and draw the initial state
    pub async fn mount(&mut self) {
        if !self.bindings.mount() {
            return;
        }

        match self.services.store.get(KEY_LAST_PROMPT).await {
            Ok(Some(prompt)) => self.prompt = prompt,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Could not restore last prompt"),
        }
        match self.services.store.get(KEY_MAX_STATEMENTS).await {
            Ok(Some(raw)) => match raw.trim().parse::<u32>() {
                Ok(n) => self.max_statements = n.clamp(1, MAX_STATEMENTS),
                Err(_) => warn!(value = %raw, "Ignoring invalid saved statement limit"),
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Could not restore statement limit"),
        }

        let filters = self.filters();
        self.view.render_filters(&filters);
        self.view.render_state(RunState::Idle);
        self.view.render_count(&CountStatus::Unknown);
        self.log.info("Analyzer ready");
        self.view.render_log(&self.log);
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn controls(&self) -> &FilterControls {
        &self.controls
    }

    /// Edit the raw controls; call [`Self::update_count`] afterwards
    pub fn controls_mut(&mut self) -> &mut FilterControls {
        &mut self.controls
    }

    /// Snapshot of the current filters
    pub fn filters(&self) -> FilterSpec {
        self.controls.gather_filters()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn max_statements(&self) -> u32 {
        self.max_statements
    }

    pub fn set_max_statements(&mut self, max_statements: u32) {
        self.max_statements = max_statements.clamp(1, MAX_STATEMENTS);
    }

    pub fn view(&self) -> &ViewRenderer<S> {
        &self.view
    }

    pub fn surface(&self) -> &S {
        self.view.surface()
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    pub fn run_state(&self) -> RunState {
        self.controller.lock().state()
    }

    pub fn run_percent(&self) -> u8 {
        self.controller.lock().percent()
    }

    pub fn result_count(&self) -> usize {
        self.controller.lock().results().len()
    }

    /// Handle that stops the live run from another task
    pub fn stop_handle(&self) -> StopHandle {
        self.controller.lock().stop_handle()
    }

    pub fn archive(&self) -> &ArchiveBrowser {
        &self.archive
    }

    pub fn chat_session(&self) -> Option<&ChatSession> {
        self.chat.session()
    }

    /// Refresh the transcript count for the current filters
    ///
    /// Debounced refreshes return immediately; the result lands on
    /// [`Self::count_updates`] and is drawn by [`Self::sync_count`].
    pub async fn update_count(&mut self, debounced: bool) -> CountStatus {
        let filters = self.filters();
        self.view.render_filters(&filters);

        let status = if debounced {
            self.refresher.update_count(filters);
            CountStatus::Pending
        } else {
            self.refresher.update_count_now(filters).await
        };
        self.show_count(&status);
        status
    }

    pub fn count_updates(&self) -> watch::Receiver<CountStatus> {
        self.refresher.subscribe()
    }

    /// Draw whatever count the refresher last published
    pub fn sync_count(&mut self) -> CountStatus {
        let status = self.refresher.status();
        self.show_count(&status);
        status
    }

    fn show_count(&mut self, status: &CountStatus) {
        if *status == self.last_count {
            return;
        }
        self.last_count = status.clone();
        match status {
            CountStatus::Ready {
                strategy: QueryStrategy::RecentWindow,
                ..
            } => {
                self.log
                    .warn("Count endpoint unavailable; showing an approximate count");
                self.view.render_log(&self.log);
            }
            CountStatus::Failed { message } => {
                self.notify_error(message.clone());
            }
            _ => {}
        }
        self.view.render_count(status);
    }

    pub fn toggle_order(&mut self) {
        let order = self.controls.toggle_order();
        debug!(order = order.as_str(), "Sort order toggled");
        self.view.render_filters(&self.filters());
    }

    pub fn cycle_sort(&mut self) {
        let sort = self.controls.cycle_sort();
        debug!(sort_by = sort.as_str(), "Sort column changed");
        self.view.render_filters(&self.filters());
    }

    pub fn toggle_emotion(&mut self, emotion: Emotion) {
        self.controls.toggle_emotion(emotion);
        self.refresher.update_count(self.filters());
        self.view.render_filters(&self.filters());
        self.show_count(&CountStatus::Pending);
    }

    /// First page for the current filters
    pub async fn browse(&mut self) -> GemmaResult<BrowsePage> {
        self.browse_offset = 0;
        self.browse_at(0).await
    }

    /// Next page, or `None` when the last page has been shown
    pub async fn next_page(&mut self) -> GemmaResult<Option<BrowsePage>> {
        if !self.browse_has_more {
            return Ok(None);
        }
        let offset = self
            .browse_offset
            .saturating_add(self.filters().page_size);
        self.browse_at(offset).await.map(Some)
    }

    async fn browse_at(&mut self, offset: u32) -> GemmaResult<BrowsePage> {
        let filters = self.filters();
        self.view.render_filters(&filters);

        match self.query.browse(&filters, offset).await {
            Ok(outcome) => {
                if outcome.is_fallback() {
                    self.log
                        .warn("Query endpoint unavailable; paging the recent window instead");
                    self.view.render_log(&self.log);
                }
                self.browse_offset = offset;
                self.browse_has_more = outcome.value.has_more;
                self.view
                    .render_browse(&outcome.value, offset, outcome.strategy);
                Ok(outcome.value)
            }
            Err(e) => {
                self.report(&e);
                Err(e)
            }
        }
    }

    /// Run a streaming analysis over the current filters
    ///
    /// Returns once the run completes, fails or is stopped. An empty prompt is
    /// rejected before anything is sent and leaves the run state untouched.
    #[instrument(skip(self))]
    pub async fn run_streaming(&mut self) -> GemmaResult<RunReport> {
        let request = match RunRequest::new(self.filters(), &self.prompt, self.max_statements) {
            Ok(request) => request,
            Err(e) => {
                self.report(&e);
                return Err(e);
            }
        };
        self.persist_preferences(&request).await;

        let (generation, token) = self.controller.lock().begin();
        self.view.begin_run(generation);
        self.log.info(format!(
            "Starting analysis of up to {} statements",
            request.max_statements
        ));
        self.view.render_log(&self.log);

        let opened = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            opened = self.services.events.open(&request) => Some(opened),
        };
        match opened {
            Some(Ok(events)) => {
                let view = &mut self.view;
                let log = &mut self.log;
                drive_run(
                    self.controller.clone(),
                    generation,
                    events,
                    token.clone(),
                    |update| {
                        match &update {
                            RunUpdate::Started { total, .. } => {
                                log.info(format!("Analyzing {} statements", total));
                            }
                            RunUpdate::Completed(outcome) => log.info(format!(
                                "Analysis complete: {} results",
                                outcome.results.len()
                            )),
                            RunUpdate::Failed { message } => log.error(message.clone()),
                            _ => {}
                        }
                        view.render_update(generation, &update);
                    },
                )
                .await;
            }
            Some(Err(e)) => {
                let update = self.controller.lock().fail(generation, &e);
                if let Some(update) = update {
                    self.view.render_update(generation, &update);
                }
            }
            None => {}
        }

        // Stopped through the handle while the channel was live or opening
        if token.is_cancelled() {
            let update = self.controller.lock().cancel();
            if let Some(update) = update {
                self.log.info("Analysis stopped");
                self.view.render_update(generation, &update);
            }
        }

        let (state, outcome, error) = {
            let controller = self.controller.lock();
            (
                controller.state(),
                controller.outcome().cloned(),
                controller.last_error().map(str::to_string),
            )
        };

        let mut local_artifact_id = None;
        if let Some(outcome) = outcome.as_ref().filter(|o| o.needs_local_artifact()) {
            let artifact = Artifact::synthesize_local(outcome, &request.prompt, Utc::now());
            let registration = self.archive.register_local(artifact);
            self.log.warn(format!(
                "Run was not archived by the server; kept locally as {}",
                registration.id
            ));
            if let Some(evicted) = registration.evicted_active {
                self.chat.clear();
                let reason = format!("{} was evicted from local storage", evicted);
                self.log.warn(reason.clone());
                self.view.render_preview(&Preview::Unavailable {
                    artifact_id: evicted,
                    reason,
                });
                self.view.render_chat(self.chat.session());
            }
            self.view.render_archive(&self.archive.listing());
            local_artifact_id = Some(registration.id);
        }
        if let Some(message) = &error {
            self.set_toast(Toast::error(message.clone()));
        }
        self.view.render_log(&self.log);

        Ok(RunReport {
            state,
            outcome,
            error,
            local_artifact_id,
        })
    }

    /// Stop the live run. Returns false when nothing was running.
    pub fn stop(&mut self) -> bool {
        let (generation, update) = {
            let mut controller = self.controller.lock();
            (controller.generation(), controller.cancel())
        };
        match update {
            Some(update) => {
                self.log.info("Analysis stopped");
                self.view.render_update(generation, &update);
                self.view.render_log(&self.log);
                true
            }
            None => false,
        }
    }

    /// Synchronous quick summary over the current filters and prompt
    pub async fn quick_analyze(&mut self) -> GemmaResult<QuickAnalysis> {
        let result = match RunRequest::new(self.filters(), &self.prompt, self.max_statements) {
            Ok(request) => self.services.analysis.quick_analyze(&request).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(analysis) => {
                self.log.info(format!(
                    "Quick analysis of {} transcripts took {:.1}s",
                    analysis.transcripts_analyzed, analysis.processing_time_seconds
                ));
                self.view.render_quick(&analysis);
                self.view.render_log(&self.log);
                Ok(analysis)
            }
            Err(e) => {
                self.report(&e);
                Err(e)
            }
        }
    }

    async fn persist_preferences(&self, request: &RunRequest) {
        let store = &self.services.store;
        if let Err(e) = store.set(KEY_LAST_PROMPT, &request.prompt).await {
            warn!(error = %e, "Could not save prompt");
        }
        if let Err(e) = store
            .set(KEY_MAX_STATEMENTS, &request.max_statements.to_string())
            .await
        {
            warn!(error = %e, "Could not save statement limit");
        }
    }

    /// Reload the archive listing from its first page
    pub async fn load_artifacts(&mut self) -> GemmaResult<usize> {
        let loaded = self.archive.load_first_page().await;
        self.after_archive_load(loaded)
    }

    pub async fn load_more_artifacts(&mut self) -> GemmaResult<usize> {
        let loaded = self.archive.load_more().await;
        self.after_archive_load(loaded)
    }

    fn after_archive_load(&mut self, loaded: GemmaResult<usize>) -> GemmaResult<usize> {
        // Local artifacts stay listed even when the server is unreachable
        self.view.render_archive(&self.archive.listing());
        if let Err(e) = &loaded {
            self.report(e);
        }
        loaded
    }

    /// Show an artifact and bind the chat to it
    ///
    /// Switching to another artifact starts a fresh chat before anything else
    /// can be appended to it.
    pub async fn preview_artifact(&mut self, artifact_id: &str) -> GemmaResult<Preview> {
        let preview = self.archive.preview_artifact(artifact_id).await;
        match &preview {
            Ok(Preview::Ready(artifact)) => {
                if self.chat.bind(&artifact.artifact_id) {
                    debug!(artifact_id = %artifact.artifact_id, "Chat reset for new artifact");
                }
            }
            Ok(Preview::Unavailable { reason, .. }) => {
                self.chat.clear();
                self.log.warn(reason.clone());
                self.view.render_log(&self.log);
            }
            Err(e) => {
                self.chat.clear();
                self.report(e);
            }
        }
        if let Ok(preview) = &preview {
            self.view.render_preview(preview);
        }
        self.view.render_chat(self.chat.session());
        preview
    }

    /// Ask about the active artifact
    pub async fn send_chat(&mut self, text: &str) -> GemmaResult<ChatExchange> {
        let Some(artifact) = self.archive.active().cloned() else {
            let e = GemmaError::validation("Select an artifact before chatting");
            self.report(&e);
            return Err(e);
        };

        let result = self.chat.send(&artifact, text).await;
        self.view.render_chat(self.chat.session());
        match &result {
            Ok(exchange) if exchange.fell_back => {
                self.log.warn(format!(
                    "Artifact chat unavailable; answered by the {} endpoint",
                    exchange.strategy
                ));
                self.view.render_log(&self.log);
            }
            Ok(_) => {}
            Err(e) => self.report(e),
        }
        result
    }

    /// Run the action bound to `event` on `selector`
    ///
    /// `value` carries the control's value: the prompt text, an emotion name,
    /// an artifact id or a chat message. Returns the action that ran, or `None`
    /// when nothing is bound.
    pub async fn dispatch(
        &mut self,
        selector: &str,
        event: UiEvent,
        value: Option<&str>,
    ) -> GemmaResult<Option<Action>> {
        let Some(action) = self.bindings.resolve(selector, event) else {
            debug!(selector, event = %event, "No binding");
            return Ok(None);
        };
        let value = value.unwrap_or_default();

        match action {
            Action::FiltersChanged => {
                self.update_count(true).await;
            }
            Action::ToggleEmotion => {
                let emotion = value
                    .parse::<Emotion>()
                    .map_err(|e| GemmaError::validation_field(e, "emotion"))?;
                self.toggle_emotion(emotion);
            }
            Action::ToggleOrder => self.toggle_order(),
            Action::CycleSort => self.cycle_sort(),
            Action::Browse => {
                self.browse().await?;
            }
            Action::NextPage => {
                self.next_page().await?;
            }
            Action::SetPrompt => self.set_prompt(value),
            Action::SetMaxStatements => match value.trim().parse::<u32>() {
                Ok(n) => self.set_max_statements(n),
                Err(_) => {
                    return Err(GemmaError::validation_field(
                        format!("'{}' is not a number", value),
                        "max_statements",
                    ));
                }
            },
            Action::RunStreaming => {
                self.run_streaming().await?;
            }
            Action::Stop => {
                self.stop();
            }
            Action::QuickAnalyze => {
                self.quick_analyze().await?;
            }
            Action::LoadArtifacts => {
                self.load_artifacts().await?;
            }
            Action::LoadMoreArtifacts => {
                self.load_more_artifacts().await?;
            }
            Action::PreviewArtifact => {
                self.preview_artifact(value).await?;
            }
            Action::SendChat => {
                self.send_chat(value).await?;
            }
        }
        Ok(Some(action))
    }

    /// Best-effort release of the server-side session; the result is only logged
    pub fn release_session(&self) -> JoinHandle<()> {
        let analysis = self.services.analysis.clone();
        tokio::spawn(async move {
            match analysis.release_session().await {
                Ok(()) => debug!("Session released"),
                Err(e) => debug!(error = %e, "Session release failed"),
            }
        })
    }

    /// Stop any live run, drop pending timers and release the session
    pub fn shutdown(&mut self) -> JoinHandle<()> {
        self.stop();
        self.refresher.cancel();
        info!("Console shutting down");
        self.release_session()
    }

    fn report(&mut self, error: &GemmaError) {
        match error.category() {
            ErrorCategory::Validation | ErrorCategory::Cancellation => {
                self.log.warn(error.user_message())
            }
            _ => self.log.error(error.user_message()),
        }
        self.view.render_log(&self.log);
        self.set_toast(Toast::error(error.user_message()));
    }

    fn notify_error(&mut self, message: String) {
        self.log.error(message.clone());
        self.view.render_log(&self.log);
        self.set_toast(Toast::error(message));
    }

    fn set_toast(&mut self, toast: Toast) {
        self.view.render_toast(&toast);
        self.toast = Some(toast);
    }
}
