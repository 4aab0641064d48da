//! Raw SSE frame

/// One dispatched SSE frame, before any payload decoding
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    /// Value of the `event:` field; `None` means the default `message` type
    pub event_type: Option<String>,
    /// All `data:` lines joined with `\n`
    pub data: String,
    /// Value of the `id:` field
    pub id: Option<String>,
}

impl SseEvent {
    /// Create a frame with only data
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            event_type: None,
            data: data.into(),
            id: None,
        }
    }

    /// Create a named frame
    pub fn with_type(event_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event_type: Some(event_type.into()),
            data: data.into(),
            id: None,
        }
    }

    /// Event name with the SSE default applied
    pub fn name(&self) -> &str {
        self.event_type.as_deref().unwrap_or("message")
    }
}
