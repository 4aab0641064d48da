//! Encoding a filter snapshot for the wire

use super::{DateRange, FilterSpec};
use serde_json::{Value, json};

impl FilterSpec {
    /// Query parameters shared by the count and browse endpoints
    pub fn filter_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        if let DateRange::Window { start, end } = self.date_range {
            if let Some(start) = start {
                pairs.push(("start_date".to_string(), start.to_string()));
            }
            if let Some(end) = end {
                pairs.push(("end_date".to_string(), end.to_string()));
            }
        }
        for speaker in &self.speakers {
            pairs.push(("speaker".to_string(), speaker.clone()));
        }
        for emotion in &self.emotions {
            pairs.push(("emotion".to_string(), emotion.to_string()));
        }
        if !self.keywords.is_empty() {
            pairs.push(("keywords".to_string(), self.keywords.join(",")));
            pairs.push(("match".to_string(), self.match_mode.as_str().to_string()));
        }

        pairs
    }

    /// Parameters for one browse page
    pub fn page_pairs(&self, offset: u32) -> Vec<(String, String)> {
        let mut pairs = self.filter_pairs();
        pairs.push(("context".to_string(), self.context_lines.to_string()));
        pairs.push(("limit".to_string(), self.page_size.to_string()));
        pairs.push(("offset".to_string(), offset.to_string()));
        pairs.push(("sort_by".to_string(), self.sort_by.as_str().to_string()));
        pairs.push(("order".to_string(), self.order.as_str().to_string()));
        pairs
    }

    /// JSON form embedded in analysis requests
    pub fn to_payload(&self) -> Value {
        let (start, end) = match self.date_range {
            DateRange::AllTime => (None, None),
            DateRange::Window { start, end } => {
                (start.map(|d| d.to_string()), end.map(|d| d.to_string()))
            }
        };
        json!({
            "start_date": start,
            "end_date": end,
            "speakers": self.speakers,
            "emotions": self.emotions,
            "keywords": self.keywords,
            "match": self.match_mode.as_str(),
            "context_lines": self.context_lines,
            "limit": self.page_size,
            "sort_by": self.sort_by.as_str(),
            "order": self.order.as_str(),
        })
    }
}
