//! Wire types for request/response endpoints

use crate::chat::Role;
use serde::{Deserialize, Serialize};

/// `GET /transcripts/count`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

/// `POST /gemma/analyze` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuickAnalysis {
    pub success: bool,
    pub analysis: String,
    pub transcripts_analyzed: u32,
    pub processing_time_seconds: f64,
    pub saved_to: Option<String>,
    pub error: Option<String>,
}

/// A source passage the chat reply relied on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default, alias = "title")]
    pub source: String,
    #[serde(default, alias = "text")]
    pub snippet: String,
}

/// One prior turn sent along with a chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

/// Body of both chat endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
    pub history: Vec<ChatTurn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    /// Inline artifact text for artifacts the server has never seen
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Reply from either chat endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatReply {
    #[serde(alias = "response", alias = "answer")]
    pub reply: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_reply_accepts_legacy_field_names() {
        let legacy: ChatReply =
            serde_json::from_str(r#"{"response": "Mostly calm.", "citations": [{"title": "run 4", "text": "..."}]}"#)
                .unwrap();
        assert_eq!(legacy.reply, "Mostly calm.");
        assert_eq!(legacy.citations[0].source, "run 4");

        let v2: ChatReply = serde_json::from_str(r#"{"reply": "Yes."}"#).unwrap();
        assert!(v2.citations.is_empty());
    }

    #[test]
    fn quick_analysis_tolerates_missing_fields() {
        let parsed: QuickAnalysis =
            serde_json::from_str(r#"{"success": true, "analysis": "ok"}"#).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.transcripts_analyzed, 0);
        assert!(parsed.saved_to.is_none());
    }
}
