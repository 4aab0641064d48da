//! Backend service contracts
//!
//! The console talks to the backend only through these traits. [`HttpApi`]
//! implements all of them over reqwest; tests substitute mocks or fakes.

mod http;
mod sanitize;
mod types;

pub use http::HttpApi;
pub use sanitize::{extract_error_detail, sanitize_error_text};
pub use types::{ChatReply, ChatRequest, ChatTurn, Citation, CountResponse, QuickAnalysis};

use crate::archive::{Artifact, ArtifactPage};
use crate::error::GemmaResult;
use crate::filter::FilterSpec;
use crate::stream::RunRequest;
use crate::transcript::{BrowsePage, ResultItem};
use async_trait::async_trait;

/// Transcript store queries
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptApi: Send + Sync {
    /// Number of transcripts matching `filters`
    async fn count(&self, filters: &FilterSpec) -> GemmaResult<u64>;

    /// One page of matching transcripts starting at `offset`
    async fn query(&self, filters: &FilterSpec, offset: u32) -> GemmaResult<BrowsePage>;

    /// The most recent `limit` transcripts, unfiltered
    async fn recent(&self, limit: u32) -> GemmaResult<Vec<ResultItem>>;
}

/// Analysis endpoints other than the event stream
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// Synchronous quick summary over the same filters and prompt a run would use
    async fn quick_analyze(&self, request: &RunRequest) -> GemmaResult<QuickAnalysis>;

    /// Tell the server to release any exclusive resource held for this client
    async fn release_session(&self) -> GemmaResult<()>;
}

/// Artifact archive and artifact chat
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArchiveApi: Send + Sync {
    /// One page of archived artifacts, newest first
    async fn list_artifacts(&self, offset: u32, limit: u32) -> GemmaResult<ArtifactPage>;

    /// Full artifact; `None` when the server has no such artifact
    async fn get_artifact(&self, artifact_id: &str) -> GemmaResult<Option<Artifact>>;

    /// Chat grounded on one artifact
    async fn chat_on_artifact(
        &self,
        artifact_id: &str,
        request: &ChatRequest,
    ) -> GemmaResult<ChatReply>;

    /// Older retrieval-augmented chat endpoint
    async fn legacy_chat(&self, request: &ChatRequest) -> GemmaResult<ChatReply>;
}
