//! Configuration data model

use crate::error::{GemmaError, GemmaResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level console configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Backend connection settings
    pub api: ApiConfig,
    /// Filter, count and streaming-run settings
    pub analysis: AnalysisConfig,
    /// Artifact archive and chat settings
    pub archive: ArchiveConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl ConsoleConfig {
    /// Reject configurations the console cannot run with
    pub fn validate(&self) -> GemmaResult<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(GemmaError::config("api.base_url must not be empty"));
        }
        if self.archive.local_capacity == 0 {
            return Err(GemmaError::config(
                "archive.local_capacity must be at least 1",
            ));
        }
        if self.archive.chat_history_limit == 0 {
            return Err(GemmaError::config(
                "archive.chat_history_limit must be at least 1",
            ));
        }
        if self.archive.page_size == 0 {
            return Err(GemmaError::config("archive.page_size must be at least 1"));
        }
        Ok(())
    }
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint path is joined to
    pub base_url: String,
    /// Timeout for request/response calls; the streaming channel has none
    pub request_timeout_secs: u64,
    /// Endpoint paths
    pub endpoints: EndpointPaths,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 30,
            endpoints: EndpointPaths::default(),
        }
    }
}

impl ApiConfig {
    /// Request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Join an endpoint path onto the base URL
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Endpoint paths relative to `base_url`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EndpointPaths {
    pub transcript_count: String,
    pub transcript_query: String,
    pub transcript_recent: String,
    pub stream_start: String,
    pub quick_analyze: String,
    pub release_session: String,
    pub artifacts: String,
    pub legacy_chat: String,
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            transcript_count: "/transcripts/count".to_string(),
            transcript_query: "/transcripts/query".to_string(),
            transcript_recent: "/transcripts/recent".to_string(),
            stream_start: "/gemma/analyze/stream/inline/start".to_string(),
            quick_analyze: "/gemma/analyze".to_string(),
            release_session: "/gemma/release-session".to_string(),
            artifacts: "/gemma/artifacts".to_string(),
            legacy_chat: "/gemma/rag/chat".to_string(),
        }
    }
}

/// Filter, count and streaming-run settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Quiet period before a count refresh fires
    pub debounce_ms: u64,
    /// Default statements analyzed per run
    pub default_max_statements: u32,
    /// Default browse page size
    pub default_page_size: u32,
    /// Lower bound of the recent-transcript window used by fallbacks
    pub fallback_recent_min: u32,
    /// Results folded into a locally synthesized summary
    pub summary_fallback_items: usize,
    /// Characters kept per result in a local summary
    pub summary_snippet_chars: usize,
    /// Entries kept in the in-UI event log
    pub event_log_capacity: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            default_max_statements: 50,
            default_page_size: 50,
            fallback_recent_min: 100,
            summary_fallback_items: 6,
            summary_snippet_chars: 160,
            event_log_capacity: 200,
        }
    }
}

impl AnalysisConfig {
    /// Debounce delay as a Duration
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Artifact archive and chat settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Local artifacts kept in memory, oldest evicted first
    pub local_capacity: usize,
    /// Remote artifacts fetched per page
    pub page_size: u32,
    /// Chat messages kept per session
    pub chat_history_limit: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            local_capacity: 5,
            page_size: 20,
            chat_history_limit: 60,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to log to console
    pub log_to_console: bool,
    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            log_to_console: true,
            format: "pretty".to_string(),
        }
    }
}
