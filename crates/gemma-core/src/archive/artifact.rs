//! Artifact records

use crate::stream::RunOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of ids minted for locally synthesized artifacts
pub const LOCAL_ID_PREFIX: &str = "local-";

const TITLE_PROMPT_CHARS: usize = 60;

/// Text record of one completed analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(alias = "id")]
    pub artifact_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "content")]
    pub body: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing)]
    pub is_local: bool,
}

impl Artifact {
    /// Build an in-memory artifact from a run the backend did not persist
    ///
    /// The body is the summary followed by one flattened section per result.
    pub fn synthesize_local(outcome: &RunOutcome, prompt: &str, now: DateTime<Utc>) -> Self {
        let mut body = outcome.summary.trim().to_string();
        for result in &outcome.results {
            body.push_str("\n\n");
            body.push_str(&result.item.to_section(result.index, &result.response));
        }

        Self {
            artifact_id: format!("{}{}", LOCAL_ID_PREFIX, now.timestamp_millis()),
            title: local_title(prompt),
            body,
            created_at: now.to_rfc3339(),
            is_local: true,
        }
    }

    pub fn is_local_id(artifact_id: &str) -> bool {
        artifact_id.starts_with(LOCAL_ID_PREFIX)
    }

    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            artifact_id: self.artifact_id.clone(),
            title: self.title.clone(),
            created_at: self.created_at.clone(),
            is_local: self.is_local,
        }
    }
}

fn local_title(prompt: &str) -> String {
    let prompt = prompt.trim();
    let short: String = prompt.chars().take(TITLE_PROMPT_CHARS).collect();
    if short.is_empty() {
        "Local analysis".to_string()
    } else if short.len() < prompt.len() {
        format!("Local analysis: {}...", short)
    } else {
        format!("Local analysis: {}", short)
    }
}

/// Archive listing row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSummary {
    #[serde(alias = "id")]
    pub artifact_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing)]
    pub is_local: bool,
}

/// One page of the remote archive
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactPage {
    #[serde(default, alias = "artifacts")]
    pub items: Vec<ArtifactSummary>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{StreamedResult, SummarySource};
    use crate::transcript::ResultItem;
    use chrono::TimeZone;

    fn outcome() -> RunOutcome {
        RunOutcome {
            generation: 1,
            model: "gemma".to_string(),
            summary: "Two calm statements.".to_string(),
            summary_source: SummarySource::Local,
            artifact_id: None,
            results: vec![StreamedResult {
                index: 1,
                response: "calm".to_string(),
                item: ResultItem {
                    speaker: "agent".to_string(),
                    emotion: "neutral".to_string(),
                    text: "How can I help?".to_string(),
                    created_at: "2024-05-01 10:00:00".to_string(),
                    ..ResultItem::default()
                },
            }],
        }
    }

    #[test]
    fn test_synthesized_artifact_has_local_id_and_sections() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let artifact = Artifact::synthesize_local(&outcome(), "How did the agent sound?", now);

        assert!(artifact.is_local);
        assert_eq!(
            artifact.artifact_id,
            format!("local-{}", now.timestamp_millis())
        );
        assert!(Artifact::is_local_id(&artifact.artifact_id));
        assert!(artifact.body.starts_with("Two calm statements."));
        assert!(
            artifact
                .body
                .contains("[1] agent (neutral) @ 2024-05-01 10:00:00: How can I help?")
        );
        assert_eq!(artifact.title, "Local analysis: How did the agent sound?");
    }

    #[test]
    fn test_remote_payload_aliases() {
        let artifact: Artifact =
            serde_json::from_str(r#"{"id": "a-9", "content": "body", "title": "Run 9"}"#).unwrap();
        assert_eq!(artifact.artifact_id, "a-9");
        assert_eq!(artifact.body, "body");
        assert!(!artifact.is_local);

        let page: ArtifactPage =
            serde_json::from_str(r#"{"artifacts": [{"id": "a-1"}], "has_more": true}"#).unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.has_more);
    }
}
