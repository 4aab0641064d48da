//! Run request and its query-string payload

use crate::error::{GemmaError, GemmaResult};
use crate::filter::FilterSpec;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use uuid::Uuid;

/// Most statements one run may analyze
pub const MAX_STATEMENTS: u32 = 200;

/// Everything the server needs to start a run; immutable once the channel opens
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub filters: FilterSpec,
    pub prompt: String,
    pub max_statements: u32,
    pub analysis_id: String,
}

impl RunRequest {
    /// Build a request; an empty prompt is rejected before anything is sent
    pub fn new(filters: FilterSpec, prompt: &str, max_statements: u32) -> GemmaResult<Self> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(GemmaError::validation_field(
                "Enter an analysis prompt before running",
                "prompt",
            ));
        }

        Ok(Self {
            filters,
            prompt: prompt.to_string(),
            max_statements: max_statements.clamp(1, MAX_STATEMENTS),
            analysis_id: Uuid::new_v4().to_string(),
        })
    }

    /// JSON body shared by the stream payload and the quick-summary endpoint
    pub fn to_json(&self) -> Value {
        json!({
            "filters": self.filters.to_payload(),
            "prompt": self.prompt,
            "max_statements": self.max_statements,
            "analysis_id": self.analysis_id,
        })
    }

    /// UTF-8 JSON, base64 with the URL-safe alphabet and no padding
    pub fn encode_payload(&self) -> GemmaResult<String> {
        let json = serde_json::to_vec(&self.to_json())?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }
}
