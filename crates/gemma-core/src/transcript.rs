//! Transcript segment payloads as returned by the transcript store

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A line of surrounding conversation shown before a matched segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextLine {
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,
}

/// One transcript segment
///
/// Immutable once received. Streamed results keep it for the lifetime of the run,
/// then it is flattened into the artifact body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub emotion: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, alias = "context")]
    pub context_before: Vec<ContextLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
}

impl ResultItem {
    /// Parse `created_at`, accepting RFC 3339 and `YYYY-MM-DD HH:MM:SS[.f]`
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.created_at.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    /// Flatten into the text section stored in an artifact body
    pub fn to_section(&self, index: u32, response: &str) -> String {
        let mut section = format!(
            "[{}] {} ({}) @ {}: {}",
            index, self.speaker, self.emotion, self.created_at, self.text
        );
        for line in &self.context_before {
            section.push_str(&format!("\n    > {}: {}", line.speaker, line.text));
        }
        if !response.trim().is_empty() {
            section.push_str("\n    Analysis: ");
            section.push_str(response.trim());
        }
        section
    }
}

/// One page of a browse query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrowsePage {
    #[serde(default)]
    pub items: Vec<ResultItem>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}
