//! Renders console state into a [`ViewSurface`]

use super::event_log::{EventLog, Toast};
use super::surface::{NodeKind, ViewNode, ViewSurface, containers};
use crate::api::QuickAnalysis;
use crate::archive::{ArtifactSummary, Preview};
use crate::chat::{ChatSession, Role};
use crate::filter::FilterSpec;
use crate::query::{CountStatus, QueryStrategy};
use crate::stream::{RunOutcome, RunState, RunUpdate, StreamedResult, SummarySource};
use crate::transcript::{BrowsePage, ResultItem};

/// Last values drawn, used to skip redundant writes
#[derive(Debug, Default)]
struct Memo {
    count: Option<String>,
    filter_summary: Option<String>,
    sort_label: Option<&'static str>,
    order_label: Option<&'static str>,
    state: Option<RunState>,
    progress: Option<(u8, String)>,
    generation: u64,
    archive: Option<Vec<ArtifactSummary>>,
    preview: Option<String>,
    chat: Option<(String, usize)>,
    log_window: Option<(u64, u64)>,
}

/// Stateless projection apart from the memo
pub struct ViewRenderer<S: ViewSurface> {
    surface: S,
    memo: Memo,
}

impl<S: ViewSurface> ViewRenderer<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            memo: Memo::default(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn render_count(&mut self, status: &CountStatus) {
        let label = status.label();
        if self.memo.count.as_deref() == Some(label.as_str()) {
            return;
        }
        let approximate = matches!(
            status,
            CountStatus::Ready {
                strategy: QueryStrategy::RecentWindow,
                ..
            }
        );
        self.surface.upsert(
            containers::COUNT,
            ViewNode::new("count", NodeKind::Text, label.clone())
                .with_attr("approximate", approximate.to_string()),
        );
        self.memo.count = Some(label);
    }

    /// Filter summary line and the sort/order button labels
    pub fn render_filters(&mut self, filters: &FilterSpec) {
        let summary = filters.describe();
        if self.memo.filter_summary.as_deref() != Some(summary.as_str()) {
            self.surface.upsert(
                containers::FILTER_SUMMARY,
                ViewNode::new("summary", NodeKind::Text, summary.clone()),
            );
            self.memo.filter_summary = Some(summary);
        }

        let sort = filters.sort_by.label();
        if self.memo.sort_label != Some(sort) {
            self.surface.upsert(
                containers::CONTROLS,
                ViewNode::new("sort", NodeKind::Button, format!("Sort: {}", sort)),
            );
            self.memo.sort_label = Some(sort);
        }

        let order = filters.order.label();
        if self.memo.order_label != Some(order) {
            self.surface.upsert(
                containers::CONTROLS,
                ViewNode::new("order", NodeKind::Button, order),
            );
            self.memo.order_label = Some(order);
        }
    }

    pub fn render_state(&mut self, state: RunState) {
        if self.memo.state == Some(state) {
            return;
        }
        self.surface.upsert(
            containers::STATUS,
            ViewNode::new("state", NodeKind::Text, state.label())
                .with_attr("running", state.is_active().to_string()),
        );
        self.memo.state = Some(state);
    }

    fn render_progress(&mut self, percent: u8, label: &str) {
        if self
            .memo
            .progress
            .as_ref()
            .is_some_and(|(p, l)| *p == percent && l == label)
        {
            return;
        }
        self.surface.upsert(
            containers::PROGRESS,
            ViewNode::new("bar", NodeKind::Progress, label)
                .with_attr("percent", percent.to_string()),
        );
        self.memo.progress = Some((percent, label.to_string()));
    }

    /// Clear the previous run's cards before run `generation` starts
    pub fn begin_run(&mut self, generation: u64) {
        self.surface.clear(containers::RESULTS);
        self.surface.clear(containers::SUMMARY);
        self.memo.generation = generation;
        self.render_progress(0, "Connecting...");
        self.render_state(RunState::Connecting);
    }

    /// Reflect one accepted update of run `generation`
    pub fn render_update(&mut self, generation: u64, update: &RunUpdate) {
        if generation != self.memo.generation {
            return;
        }
        match update {
            RunUpdate::Started { total, message } => {
                self.render_state(RunState::Running);
                let label = message
                    .clone()
                    .unwrap_or_else(|| format!("Analyzing {} statements", total));
                self.render_progress(0, &label);
            }
            RunUpdate::Progress { percent, label } => {
                self.render_state(RunState::Running);
                self.render_progress(*percent, label);
            }
            RunUpdate::ResultAppended { result, percent } => {
                self.render_state(RunState::Running);
                self.surface
                    .append(containers::RESULTS, result_card(generation, result));
                let label = format!("Completed statement {}", result.index);
                self.render_progress(*percent, &label);
            }
            RunUpdate::Completed(outcome) => {
                self.render_progress(100, "Analysis complete");
                self.render_summary(outcome);
                self.render_state(RunState::Completed);
            }
            RunUpdate::Failed { message } => {
                self.surface.upsert(
                    containers::SUMMARY,
                    ViewNode::new("error", NodeKind::Notice, message.clone())
                        .with_attr("level", "error"),
                );
                self.render_state(RunState::Errored);
            }
            RunUpdate::Cancelled => self.render_state(RunState::Cancelled),
        }
    }

    fn render_summary(&mut self, outcome: &RunOutcome) {
        let mut node = ViewNode::new("summary", NodeKind::Card, outcome.summary.clone())
            .with_attr(
                "source",
                match outcome.summary_source {
                    SummarySource::Server => "server",
                    SummarySource::Local => "local",
                },
            );
        if !outcome.model.is_empty() {
            node = node.with_attr("model", outcome.model.clone());
        }
        if let Some(id) = &outcome.artifact_id {
            node = node.with_attr("artifact_id", id.clone());
        }
        self.surface.upsert(containers::SUMMARY, node);
    }

    pub fn render_quick(&mut self, analysis: &QuickAnalysis) {
        let mut node = ViewNode::new("quick", NodeKind::Card, analysis.analysis.clone())
            .with_attr("transcripts", analysis.transcripts_analyzed.to_string())
            .with_attr(
                "seconds",
                format!("{:.1}", analysis.processing_time_seconds),
            );
        if let Some(saved) = &analysis.saved_to {
            node = node.with_attr("saved_to", saved.clone());
        }
        self.surface.upsert(containers::SUMMARY, node);
    }

    /// Browse rows; a page at offset 0 replaces the list, later pages append
    pub fn render_browse(&mut self, page: &BrowsePage, offset: u32, strategy: QueryStrategy) {
        if offset == 0 {
            self.surface.clear(containers::BROWSE);
        }
        for (i, item) in page.items.iter().enumerate() {
            let position = offset as usize + i;
            self.surface
                .append(containers::BROWSE, browse_row(position, item));
        }

        let mut footer = match page.total {
            Some(total) => format!("{} matching", total),
            None => String::new(),
        };
        if strategy.is_approximate() {
            footer.push_str(" (recent window only)");
        }
        // Footer is re-keyed so it stays the last node
        self.surface.remove(containers::BROWSE, "footer");
        self.surface.append(
            containers::BROWSE,
            ViewNode::new("footer", NodeKind::Notice, footer.trim().to_string())
                .with_attr("has_more", page.has_more.to_string()),
        );
    }

    pub fn render_archive(&mut self, listing: &[ArtifactSummary]) {
        if self.memo.archive.as_deref() == Some(listing) {
            return;
        }
        self.surface.clear(containers::ARCHIVE);
        for summary in listing {
            let title = if summary.title.is_empty() {
                summary.artifact_id.clone()
            } else {
                summary.title.clone()
            };
            self.surface.append(
                containers::ARCHIVE,
                ViewNode::new(
                    format!("artifact-{}", summary.artifact_id),
                    NodeKind::Row,
                    title,
                )
                .with_attr("artifact_id", summary.artifact_id.clone())
                .with_attr("local", summary.is_local.to_string())
                .with_attr("created_at", summary.created_at.clone()),
            );
        }
        self.memo.archive = Some(listing.to_vec());
    }

    pub fn render_preview(&mut self, preview: &Preview) {
        let key = match preview {
            Preview::Ready(artifact) => format!("ready:{}", artifact.artifact_id),
            Preview::Unavailable { artifact_id, .. } => format!("unavailable:{}", artifact_id),
        };
        if self.memo.preview.as_deref() == Some(key.as_str()) {
            return;
        }
        self.surface.clear(containers::PREVIEW);
        let node = match preview {
            Preview::Ready(artifact) => {
                ViewNode::new("artifact", NodeKind::Card, artifact.body.clone())
                    .with_attr("title", artifact.title.clone())
                    .with_attr("artifact_id", artifact.artifact_id.clone())
                    .with_attr("local", artifact.is_local.to_string())
            }
            Preview::Unavailable {
                artifact_id,
                reason,
            } => ViewNode::new("unavailable", NodeKind::Notice, reason.clone())
                .with_attr("artifact_id", artifact_id.clone()),
        };
        self.surface.upsert(containers::PREVIEW, node);
        self.memo.preview = Some(key);
    }

    /// Chat history; a different session id redraws from scratch
    pub fn render_chat(&mut self, session: Option<&ChatSession>) {
        let Some(session) = session else {
            if self.memo.chat.take().is_some() {
                self.surface.clear(containers::CHAT);
            }
            return;
        };

        let same_session = self
            .memo
            .chat
            .as_ref()
            .is_some_and(|(id, _)| id == session.session_id());
        if same_session && self.memo.chat.as_ref().map(|(_, n)| *n) == Some(session.len()) {
            return;
        }
        // Trimming shifts positions, so keys are rebuilt
        self.surface.clear(containers::CHAT);
        for (i, message) in session.messages().enumerate() {
            let mut text = message.content.clone();
            for citation in &message.citations {
                text.push_str(&format!("\n  [{}] {}", citation.source, citation.snippet));
            }
            let role = match message.role {
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::System => "system",
            };
            self.surface.append(
                containers::CHAT,
                ViewNode::new(format!("msg-{}", i), NodeKind::Message, text)
                    .with_attr("role", role)
                    .with_attr("citations", message.citations.len().to_string()),
            );
        }
        self.memo.chat = Some((session.session_id().to_string(), session.len()));
    }

    /// Append new log entries and drop the ones the log has evicted
    pub fn render_log(&mut self, log: &EventLog) {
        let (Some(first), Some(last)) = (log.first_seq(), log.last().map(|e| e.seq)) else {
            return;
        };
        if self.memo.log_window == Some((first, last)) {
            return;
        }
        if let Some((old_first, _)) = self.memo.log_window {
            for seq in old_first..first {
                self.surface.remove(containers::LOG, &format!("log-{}", seq));
            }
        }
        for entry in log.entries() {
            self.surface.append(
                containers::LOG,
                ViewNode::new(
                    format!("log-{}", entry.seq),
                    NodeKind::Text,
                    format!("{} {}", entry.timestamp.format("%H:%M:%S"), entry.message),
                )
                .with_attr("level", entry.level.to_string()),
            );
        }
        self.memo.log_window = Some((first, last));
    }

    pub fn render_toast(&mut self, toast: &Toast) {
        self.surface.upsert(
            containers::TOASTS,
            ViewNode::new("toast", NodeKind::Notice, toast.message.clone())
                .with_attr("level", toast.level.to_string()),
        );
    }
}

fn result_card(generation: u64, result: &StreamedResult) -> ViewNode {
    let item = &result.item;
    let mut text = format!(
        "[{}] {} ({}): {}",
        result.index, item.speaker, item.emotion, item.text
    );
    for line in &item.context_before {
        text.push_str(&format!("\n  > {}: {}", line.speaker, line.text));
    }
    if !result.response.trim().is_empty() {
        text.push('\n');
        text.push_str(result.response.trim());
    }
    ViewNode::new(
        format!("result-{}-{}", generation, result.index),
        NodeKind::Card,
        text,
    )
    .with_attr("index", result.index.to_string())
    .with_attr("speaker", item.speaker.clone())
    .with_attr("emotion", item.emotion.clone())
    .with_attr("created_at", item.created_at.clone())
}

fn browse_row(position: usize, item: &ResultItem) -> ViewNode {
    ViewNode::new(
        format!("row-{}", position),
        NodeKind::Row,
        format!("{} ({}): {}", item.speaker, item.emotion, item.text),
    )
    .with_attr("created_at", item.created_at.clone())
    .with_attr("job_id", item.job_id.clone().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::Artifact;
    use crate::chat::Message;
    use crate::filter::SortBy;
    use crate::view::NodeTree;

    fn streamed(index: u32) -> StreamedResult {
        StreamedResult {
            index,
            response: "calm".to_string(),
            item: ResultItem {
                speaker: "agent".to_string(),
                emotion: "neutral".to_string(),
                text: format!("statement {}", index),
                ..ResultItem::default()
            },
        }
    }

    #[test]
    fn test_repeated_updates_do_not_duplicate_cards() {
        let mut view = ViewRenderer::new(NodeTree::new());
        view.begin_run(1);
        let update = RunUpdate::ResultAppended {
            result: streamed(1),
            percent: 33,
        };
        view.render_update(1, &update);
        view.render_update(1, &update);
        view.render_update(
            1,
            &RunUpdate::ResultAppended {
                result: streamed(2),
                percent: 67,
            },
        );

        let tree = view.surface();
        assert_eq!(
            tree.keys(containers::RESULTS),
            vec!["result-1-1", "result-1-2"]
        );
        assert_eq!(
            tree.get(containers::PROGRESS, "bar")
                .and_then(|n| n.attr("percent")),
            Some("67")
        );
    }

    #[test]
    fn test_updates_from_old_generation_are_not_drawn() {
        let mut view = ViewRenderer::new(NodeTree::new());
        view.begin_run(2);
        let revision = view.surface().revision();

        view.render_update(
            1,
            &RunUpdate::ResultAppended {
                result: streamed(1),
                percent: 50,
            },
        );
        assert_eq!(view.surface().revision(), revision);
    }

    #[test]
    fn test_sort_labels_are_memoized() {
        let mut view = ViewRenderer::new(NodeTree::new());
        let mut filters = FilterSpec::default();
        view.render_filters(&filters);
        let revision = view.surface().revision();

        view.render_filters(&filters);
        assert_eq!(view.surface().revision(), revision);

        filters.sort_by = SortBy::Speaker;
        view.render_filters(&filters);
        assert_eq!(
            view.surface().text(containers::CONTROLS, "sort"),
            Some("Sort: Speaker")
        );
    }

    #[test]
    fn test_unavailable_preview_is_explicit() {
        let mut view = ViewRenderer::new(NodeTree::new());
        view.render_preview(&Preview::Ready(Artifact {
            artifact_id: "a-1".to_string(),
            title: "Run 1".to_string(),
            body: "body".to_string(),
            created_at: String::new(),
            is_local: false,
        }));
        view.render_preview(&Preview::Unavailable {
            artifact_id: "a-2".to_string(),
            reason: "Artifact not found or empty".to_string(),
        });

        let tree = view.surface();
        assert_eq!(tree.keys(containers::PREVIEW), vec!["unavailable"]);
    }

    #[test]
    fn test_chat_redraws_on_new_session() {
        let mut view = ViewRenderer::new(NodeTree::new());
        let mut first = ChatSession::new("a-1", 60);
        first.push(Message::user("hi"));
        first.push(Message::assistant("hello"));
        view.render_chat(Some(&first));
        assert_eq!(view.surface().children(containers::CHAT).len(), 2);

        let second = ChatSession::new("a-2", 60);
        view.render_chat(Some(&second));
        assert!(view.surface().children(containers::CHAT).is_empty());
    }

    #[test]
    fn test_log_panel_follows_bounded_log() {
        let mut view = ViewRenderer::new(NodeTree::new());
        let mut log = EventLog::new(2);
        log.info("one");
        log.info("two");
        view.render_log(&log);
        log.info("three");
        view.render_log(&log);

        assert_eq!(view.surface().keys(containers::LOG), vec!["log-1", "log-2"]);
    }
}
