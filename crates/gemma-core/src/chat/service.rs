//! Sending chat messages through the v2/legacy strategy chain

use super::session::{ChatSession, DEFAULT_HISTORY_LIMIT, Message};
use crate::api::{ArchiveApi, ChatReply, ChatRequest};
use crate::archive::Artifact;
use crate::error::{GemmaError, GemmaResult};
use crate::fallback::run_chain;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument};

/// Endpoint that answered a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatStrategy {
    /// Chat-on-artifact endpoint
    ArtifactV2,
    /// Older retrieval-augmented chat
    LegacyRag,
}

impl fmt::Display for ChatStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArtifactV2 => write!(f, "v2"),
            Self::LegacyRag => write!(f, "legacy"),
        }
    }
}

const REMOTE_CHAIN: [ChatStrategy; 2] = [ChatStrategy::ArtifactV2, ChatStrategy::LegacyRag];
const LOCAL_CHAIN: [ChatStrategy; 1] = [ChatStrategy::LegacyRag];

/// One answered message
#[derive(Debug, Clone, PartialEq)]
pub struct ChatExchange {
    pub reply: Message,
    pub strategy: ChatStrategy,
    pub fell_back: bool,
}

/// Chat for whichever artifact is active
pub struct ChatService {
    api: Arc<dyn ArchiveApi>,
    session: Option<ChatSession>,
    history_limit: usize,
}

impl ChatService {
    pub fn new(api: Arc<dyn ArchiveApi>, history_limit: usize) -> Self {
        Self {
            api,
            session: None,
            history_limit: if history_limit == 0 {
                DEFAULT_HISTORY_LIMIT
            } else {
                history_limit
            },
        }
    }

    pub fn session(&self) -> Option<&ChatSession> {
        self.session.as_ref()
    }

    /// Bind the chat to `artifact_id`
    ///
    /// Switching to a different artifact starts a fresh session, so history
    /// never mentions an artifact other than the one previewed. Returns true
    /// when a reset happened.
    pub fn bind(&mut self, artifact_id: &str) -> bool {
        if self.session.as_ref().map(ChatSession::artifact_id) == Some(artifact_id) {
            return false;
        }
        self.session = Some(ChatSession::new(artifact_id, self.history_limit));
        true
    }

    /// Forget the session entirely (no artifact is active)
    pub fn clear(&mut self) {
        self.session = None;
    }

    /// Send `text` about `artifact`
    ///
    /// Local artifacts cannot exist server-side, so they skip the v2 endpoint
    /// and go to the legacy one with their body inlined as context.
    #[instrument(skip(self, artifact, text), fields(artifact_id = %artifact.artifact_id))]
    pub async fn send(&mut self, artifact: &Artifact, text: &str) -> GemmaResult<ChatExchange> {
        let text = text.trim();
        if text.is_empty() {
            return Err(GemmaError::validation_field("Type a message first", "message"));
        }
        self.bind(&artifact.artifact_id);
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| GemmaError::other("chat session missing after bind"))?;

        let is_local = artifact.is_local || Artifact::is_local_id(&artifact.artifact_id);
        let request = ChatRequest {
            message: text.to_string(),
            session_id: session.session_id().to_string(),
            history: session.history(),
            artifact_id: (!is_local).then(|| artifact.artifact_id.clone()),
            context: is_local.then(|| artifact.body.clone()),
        };
        session.push(Message::user(text));

        let chain: &[ChatStrategy] = if is_local { &LOCAL_CHAIN } else { &REMOTE_CHAIN };
        let api = &self.api;
        let request = &request;
        let outcome = run_chain(chain, |strategy| async move {
            match strategy {
                ChatStrategy::ArtifactV2 => {
                    api.chat_on_artifact(&artifact.artifact_id, request).await
                }
                ChatStrategy::LegacyRag => api.legacy_chat(request).await,
            }
        })
        .await?;

        let fell_back = outcome.is_fallback();
        let strategy = outcome.strategy;
        let ChatReply { reply, citations } = outcome.value;
        let reply = Message::assistant(reply).with_citations(citations);
        session.push(reply.clone());

        info!(strategy = %strategy, fell_back, "Chat reply received");
        Ok(ChatExchange {
            reply,
            strategy,
            fell_back,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Citation, MockArchiveApi};

    fn remote(id: &str) -> Artifact {
        Artifact {
            artifact_id: id.to_string(),
            title: id.to_string(),
            body: "remote body".to_string(),
            created_at: String::new(),
            is_local: false,
        }
    }

    fn reply(text: &str) -> ChatReply {
        ChatReply {
            reply: text.to_string(),
            citations: vec![Citation {
                source: "statement 2".to_string(),
                snippet: "I want a refund".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn test_v2_answers_first() {
        let mut api = MockArchiveApi::new();
        api.expect_chat_on_artifact()
            .times(1)
            .returning(|_, _| Ok(reply("v2 says hi")));
        api.expect_legacy_chat().never();

        let mut chat = ChatService::new(Arc::new(api), 60);
        let exchange = chat.send(&remote("a-1"), "hello").await.unwrap();

        assert_eq!(exchange.strategy, ChatStrategy::ArtifactV2);
        assert!(!exchange.fell_back);
        assert_eq!(exchange.reply.citations.len(), 1);
        assert_eq!(chat.session().map(ChatSession::len), Some(2));
    }

    #[tokio::test]
    async fn test_falls_back_to_legacy_on_404() {
        let mut api = MockArchiveApi::new();
        api.expect_chat_on_artifact()
            .times(1)
            .returning(|_, _| Err(GemmaError::http(404, "Not Found")));
        api.expect_legacy_chat()
            .times(1)
            .withf(|req| req.artifact_id.as_deref() == Some("a-1") && req.history.is_empty())
            .returning(|_| Ok(reply("legacy answer")));

        let mut chat = ChatService::new(Arc::new(api), 60);
        let exchange = chat.send(&remote("a-1"), "hello").await.unwrap();

        assert_eq!(exchange.strategy, ChatStrategy::LegacyRag);
        assert!(exchange.fell_back);
        assert_eq!(exchange.reply.content, "legacy answer");
    }

    #[tokio::test]
    async fn test_falls_back_when_v2_body_is_not_json() {
        let mut api = MockArchiveApi::new();
        api.expect_chat_on_artifact().times(1).returning(|_, _| {
            Err(GemmaError::malformed_response(
                "expected value at line 1 column 1",
                "/gemma/artifacts/a-1/chat",
            ))
        });
        api.expect_legacy_chat()
            .times(1)
            .returning(|_| Ok(reply("legacy answer")));

        let mut chat = ChatService::new(Arc::new(api), 60);
        let exchange = chat.send(&remote("a-1"), "hello").await.unwrap();
        assert_eq!(exchange.strategy, ChatStrategy::LegacyRag);
        assert!(exchange.fell_back);
    }

    #[tokio::test]
    async fn test_client_error_does_not_fall_back() {
        let mut api = MockArchiveApi::new();
        api.expect_chat_on_artifact()
            .returning(|_, _| Err(GemmaError::http(400, "message too long")));
        api.expect_legacy_chat().never();

        let mut chat = ChatService::new(Arc::new(api), 60);
        let err = chat.send(&remote("a-1"), "hello").await.unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn test_local_artifact_skips_v2_and_inlines_body() {
        let mut api = MockArchiveApi::new();
        api.expect_chat_on_artifact().never();
        api.expect_legacy_chat()
            .withf(|req| req.artifact_id.is_none() && req.context.as_deref() == Some("local body"))
            .returning(|_| Ok(reply("from legacy")));

        let local = Artifact {
            artifact_id: "local-1".to_string(),
            title: String::new(),
            body: "local body".to_string(),
            created_at: String::new(),
            is_local: true,
        };
        let mut chat = ChatService::new(Arc::new(api), 60);
        let exchange = chat.send(&local, "summarize").await.unwrap();
        assert_eq!(exchange.strategy, ChatStrategy::LegacyRag);
        assert!(!exchange.fell_back);
    }

    #[tokio::test]
    async fn test_switching_artifact_resets_history() {
        let mut api = MockArchiveApi::new();
        api.expect_chat_on_artifact()
            .returning(|_, _| Ok(reply("ok")));

        let mut chat = ChatService::new(Arc::new(api), 60);
        chat.send(&remote("a-1"), "first").await.unwrap();
        let first_session = chat.session().map(|s| s.session_id().to_string());

        assert!(chat.bind("a-2"));
        let session = chat.session().unwrap();
        assert!(session.is_empty());
        assert_eq!(session.artifact_id(), "a-2");
        assert_ne!(Some(session.session_id().to_string()), first_session);
        assert!(!chat.bind("a-2"));
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected_without_request() {
        let api = MockArchiveApi::new();
        let mut chat = ChatService::new(Arc::new(api), 60);
        let err = chat.send(&remote("a-1"), "  ").await.unwrap_err();
        assert!(matches!(err, GemmaError::Validation { .. }));
        assert!(chat.session().is_none());
    }
}
