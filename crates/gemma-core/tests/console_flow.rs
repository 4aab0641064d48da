//! End-to-end console flow against an in-process backend

use async_trait::async_trait;
use gemma_core::api::{ChatReply, ChatRequest, QuickAnalysis};
use gemma_core::archive::ArtifactPage;
use gemma_core::stream::{DoneEvent, EventStream, MetaEvent, ResultEvent, StepEvent};
use gemma_core::view::containers;
use gemma_core::{
    AnalysisApi, AnalyzerConsole, ArchiveApi, Artifact, ArtifactSummary, ChatStrategy,
    ConsoleConfig, ConsoleServices, CountStatus, EventSource, FilterSpec, GemmaError,
    GemmaResult, MemoryStore, NodeTree, Preview, QueryStrategy, ResultItem, RunRequest, RunState,
    StreamEvent, TranscriptApi,
};
use gemma_core::transcript::BrowsePage;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct Backend {
    opened: Mutex<Vec<RunRequest>>,
    chats: Mutex<Vec<&'static str>>,
}

fn item(speaker: &str, emotion: &str, text: &str) -> ResultItem {
    ResultItem {
        speaker: speaker.to_string(),
        emotion: emotion.to_string(),
        text: text.to_string(),
        created_at: "2024-05-01T10:00:00Z".to_string(),
        ..ResultItem::default()
    }
}

#[async_trait]
impl TranscriptApi for Backend {
    async fn count(&self, _filters: &FilterSpec) -> GemmaResult<u64> {
        Err(GemmaError::http(503, "count service restarting"))
    }

    async fn query(&self, _filters: &FilterSpec, _offset: u32) -> GemmaResult<BrowsePage> {
        Err(GemmaError::transport("connection refused"))
    }

    async fn recent(&self, _limit: u32) -> GemmaResult<Vec<ResultItem>> {
        Ok(vec![
            item("customer", "anger", "Where is my refund"),
            item("agent", "neutral", "Let me look that up"),
            item("customer", "anger", "This is unacceptable"),
        ])
    }
}

#[async_trait]
impl AnalysisApi for Backend {
    async fn quick_analyze(&self, request: &RunRequest) -> GemmaResult<QuickAnalysis> {
        Ok(QuickAnalysis {
            success: true,
            analysis: format!("Quick take on: {}", request.prompt),
            transcripts_analyzed: 3,
            processing_time_seconds: 0.4,
            saved_to: None,
            error: None,
        })
    }

    async fn release_session(&self) -> GemmaResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ArchiveApi for Backend {
    async fn list_artifacts(&self, _offset: u32, _limit: u32) -> GemmaResult<ArtifactPage> {
        Ok(ArtifactPage {
            items: vec![ArtifactSummary {
                artifact_id: "a-42".to_string(),
                title: "Refund complaints".to_string(),
                created_at: "2024-05-02T00:00:00Z".to_string(),
                is_local: false,
            }],
            has_more: false,
            total: Some(1),
        })
    }

    async fn get_artifact(&self, artifact_id: &str) -> GemmaResult<Option<Artifact>> {
        Ok((artifact_id == "a-42").then(|| Artifact {
            artifact_id: "a-42".to_string(),
            title: "Refund complaints".to_string(),
            body: "Customers asked about refunds twice.".to_string(),
            created_at: "2024-05-02T00:00:00Z".to_string(),
            is_local: false,
        }))
    }

    async fn chat_on_artifact(
        &self,
        _artifact_id: &str,
        _request: &ChatRequest,
    ) -> GemmaResult<ChatReply> {
        self.chats.lock().push("v2");
        Err(GemmaError::http(502, "Bad Gateway"))
    }

    async fn legacy_chat(&self, request: &ChatRequest) -> GemmaResult<ChatReply> {
        self.chats.lock().push("legacy");
        Ok(ChatReply {
            reply: format!("Re: {}", request.message),
            citations: Vec::new(),
        })
    }
}

#[async_trait]
impl EventSource for Backend {
    async fn open(&self, request: &RunRequest) -> GemmaResult<EventStream> {
        self.opened.lock().push(request.clone());
        let events = vec![
            StreamEvent::Meta(MetaEvent {
                total: 2,
                max_statements: 2,
                message: Some("Analyzing 2 statements".to_string()),
            }),
            StreamEvent::Step(StepEvent {
                index: 1,
                total: 2,
                status: "analyzing".to_string(),
                fragment: None,
            }),
            StreamEvent::Result(ResultEvent {
                index: 1,
                total: 2,
                response: "Frustrated about a delayed refund".to_string(),
                item: item("customer", "anger", "Where is my refund"),
            }),
            StreamEvent::Result(ResultEvent {
                index: 2,
                total: 2,
                response: "Escalation risk".to_string(),
                item: item("customer", "anger", "This is unacceptable"),
            }),
            StreamEvent::Done(DoneEvent {
                model: "gemma-3".to_string(),
                summary: Some("Refund delays drive anger.".to_string()),
                artifact_id: Some("a-43".to_string()),
            }),
        ];
        Ok(Box::pin(futures::stream::iter(events.into_iter().map(Ok))))
    }
}

fn console(backend: Arc<Backend>) -> AnalyzerConsole<NodeTree> {
    let services = ConsoleServices {
        transcripts: backend.clone(),
        analysis: backend.clone(),
        archive: backend.clone(),
        events: backend,
        store: Arc::new(MemoryStore::new()),
    };
    AnalyzerConsole::new(ConsoleConfig::default(), services, NodeTree::new())
}

#[tokio::test]
async fn full_session_survives_degraded_backend() {
    let backend = Arc::new(Backend::default());
    let mut console = console(backend.clone());
    console.mount().await;

    console.controls_mut().speakers = "customer".to_string();
    let status = console.update_count(false).await;
    assert_eq!(
        status,
        CountStatus::Ready {
            count: 2,
            strategy: QueryStrategy::RecentWindow
        }
    );
    assert_eq!(
        console
            .surface()
            .get(containers::COUNT, "count")
            .and_then(|n| n.attr("approximate")),
        Some("true")
    );

    let page = console.browse().await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert!(console.next_page().await.unwrap().is_none());

    console.set_prompt("What drives the anger?");
    console.set_max_statements(2);
    let report = console.run_streaming().await.unwrap();
    assert_eq!(report.state, RunState::Completed);
    assert!(report.local_artifact_id.is_none());
    assert_eq!(
        report.outcome.as_ref().map(|o| o.summary.as_str()),
        Some("Refund delays drive anger.")
    );
    assert_eq!(
        console.surface().keys(containers::RESULTS),
        vec!["result-1-1", "result-1-2"]
    );

    let opened = backend.opened.lock().clone();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].max_statements, 2);
    assert!(opened[0].filters.speakers.contains("customer"));

    let quick = console.quick_analyze().await.unwrap();
    assert_eq!(quick.analysis, "Quick take on: What drives the anger?");

    assert_eq!(console.load_artifacts().await.unwrap(), 1);
    let preview = console.preview_artifact("a-42").await.unwrap();
    assert!(matches!(preview, Preview::Ready(_)));
    let exchange = console.send_chat("How many refunds?").await.unwrap();
    assert_eq!(exchange.strategy, ChatStrategy::LegacyRag);
    assert!(exchange.fell_back);
    assert_eq!(*backend.chats.lock(), vec!["v2", "legacy"]);

    let missing = console.preview_artifact("a-999").await.unwrap();
    assert!(matches!(missing, Preview::Unavailable { .. }));
    assert!(console.chat_session().is_none());

    console.shutdown().await.unwrap();
}
