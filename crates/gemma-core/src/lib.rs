//! Gemma transcript analyzer core library
//!
//! This crate provides the client side of the transcript analysis console:
//! filter modelling, transcript counts and browsing with client-side fallback,
//! streaming analysis runs, the artifact archive and artifact chat.

pub mod api;
pub mod archive;
pub mod chat;
pub mod config;
pub mod console;
pub mod debounce;
pub mod error;
pub mod fallback;
pub mod filter;
pub mod query;
pub mod sse;
pub mod store;
pub mod stream;
pub mod transcript;
pub mod view;

// Re-export commonly used types
pub use api::{AnalysisApi, ArchiveApi, HttpApi, TranscriptApi};
pub use archive::{Artifact, ArtifactSummary, Preview};
pub use chat::{ChatExchange, ChatStrategy};
pub use config::{ConsoleConfig, load_config};
pub use console::{AnalyzerConsole, ConsoleServices, RunReport};
pub use error::{GemmaError, GemmaResult};
pub use filter::{FilterControls, FilterSpec};
pub use query::{CountStatus, QueryStrategy};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use stream::{EventSource, RunRequest, RunState, StopHandle, StreamEvent};
pub use transcript::{BrowsePage, ResultItem};
pub use view::{NodeTree, ViewSurface};
