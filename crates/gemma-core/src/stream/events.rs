//! Typed events carried by the analysis stream

use crate::error::{GemmaError, GemmaResult};
use crate::sse::SseEvent;
use crate::transcript::ResultItem;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// `meta`: sent once, before any step or result
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetaEvent {
    #[serde(default)]
    pub total: u32,
    #[serde(default, alias = "maxStatements")]
    pub max_statements: u32,
    #[serde(default)]
    pub message: Option<String>,
}

/// `step`: the server started on statement `index` (1-based)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StepEvent {
    pub index: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub fragment: Option<String>,
}

/// `result`: statement `index` finished
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultEvent {
    pub index: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub item: ResultItem,
}

/// `done`: the run finished
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DoneEvent {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, alias = "artifactId")]
    pub artifact_id: Option<String>,
}

/// One event of a streaming run
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Meta(MetaEvent),
    Step(StepEvent),
    Result(ResultEvent),
    Done(DoneEvent),
    ServerError { detail: String },
}

impl StreamEvent {
    /// Decode a raw frame
    ///
    /// Unknown event names (keep-alives, `message`) yield `Ok(None)`. A bare
    /// `error` frame without data is the channel itself failing and becomes a
    /// stream error rather than an event.
    pub fn from_sse(frame: &SseEvent) -> GemmaResult<Option<Self>> {
        let event = match frame.name() {
            "meta" => Self::Meta(parse(frame)?),
            "step" => Self::Step(parse(frame)?),
            "result" => Self::Result(parse(frame)?),
            "done" => Self::Done(if frame.data.trim().is_empty() {
                DoneEvent::default()
            } else {
                parse(frame)?
            }),
            "server_error" => Self::ServerError {
                detail: error_detail(&frame.data),
            },
            "error" if frame.data.trim().is_empty() => {
                return Err(GemmaError::stream("event stream reported a connection error"));
            }
            "error" => Self::ServerError {
                detail: error_detail(&frame.data),
            },
            other => {
                debug!(event = other, "Ignoring unrecognized stream event");
                return Ok(None);
            }
        };
        Ok(Some(event))
    }

    /// Whether this event ends the run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::ServerError { .. })
    }
}

fn parse<T: DeserializeOwned>(frame: &SseEvent) -> GemmaResult<T> {
    serde_json::from_str(&frame.data).map_err(|e| {
        GemmaError::json_with_context(
            e.to_string(),
            format!("Decoding '{}' stream event", frame.name()),
        )
    })
}

fn error_detail(data: &str) -> String {
    match serde_json::from_str::<Value>(data) {
        Ok(json) => ["detail", "error", "message"]
            .iter()
            .find_map(|k| json.get(*k).and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| data.trim().to_string()),
        Err(_) => data.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_each_named_event() {
        let meta = StreamEvent::from_sse(&SseEvent::with_type(
            "meta",
            r#"{"total": 3, "max_statements": 3, "message": "Analyzing 3 statements"}"#,
        ))
        .unwrap()
        .unwrap();
        assert!(matches!(meta, StreamEvent::Meta(MetaEvent { total: 3, .. })));

        let result = StreamEvent::from_sse(&SseEvent::with_type(
            "result",
            r#"{"index": 2, "total": 3, "response": "calm", "item": {"speaker": "agent", "text": "hi"}}"#,
        ))
        .unwrap()
        .unwrap();
        match result {
            StreamEvent::Result(r) => {
                assert_eq!(r.index, 2);
                assert_eq!(r.item.speaker, "agent");
            }
            other => panic!("unexpected event {other:?}"),
        }

        let done = StreamEvent::from_sse(&SseEvent::with_type(
            "done",
            r#"{"model": "gemma-3", "artifactId": "a-17"}"#,
        ))
        .unwrap()
        .unwrap();
        assert_eq!(
            done,
            StreamEvent::Done(DoneEvent {
                model: "gemma-3".to_string(),
                summary: None,
                artifact_id: Some("a-17".to_string()),
            })
        );
    }

    #[test]
    fn test_server_error_detail_is_verbatim() {
        let event =
            StreamEvent::from_sse(&SseEvent::with_type("server_error", r#"{"detail": "GPU busy"}"#))
                .unwrap()
                .unwrap();
        assert_eq!(
            event,
            StreamEvent::ServerError {
                detail: "GPU busy".to_string()
            }
        );

        let plain = StreamEvent::from_sse(&SseEvent::with_type("error", "model crashed"))
            .unwrap()
            .unwrap();
        assert!(plain.is_terminal());
    }

    #[test]
    fn test_bare_error_is_a_transport_failure() {
        let err = StreamEvent::from_sse(&SseEvent::with_type("error", "")).unwrap_err();
        assert!(matches!(err, GemmaError::Stream { .. }));
    }

    #[test]
    fn test_unknown_events_are_skipped() {
        assert_eq!(StreamEvent::from_sse(&SseEvent::new("ping")).unwrap(), None);
    }

    #[test]
    fn test_malformed_payload_is_json_error() {
        let err = StreamEvent::from_sse(&SseEvent::with_type("step", "{oops")).unwrap_err();
        assert!(matches!(err, GemmaError::Json { .. }));
    }
}
