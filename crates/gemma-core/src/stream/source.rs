//! Opening the server-push channel for a run

use super::events::StreamEvent;
use super::request::RunRequest;
use crate::error::{GemmaError, GemmaResult};
use crate::sse::SseDecoder;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;

/// Lazy, ordered sequence of events for one run
///
/// Ends after the server closes the channel. A transport failure is yielded as
/// an `Err` item and nothing follows it.
pub type EventStream = Pin<Box<dyn Stream<Item = GemmaResult<StreamEvent>> + Send>>;

/// Opens one event channel per run
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn open(&self, request: &RunRequest) -> GemmaResult<EventStream>;
}

struct DecodeState<S> {
    bytes: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<GemmaResult<StreamEvent>>,
    finished: bool,
}

impl<S> DecodeState<S> {
    fn push_frames(&mut self, frames: impl IntoIterator<Item = crate::sse::SseEvent>) {
        for frame in frames {
            match StreamEvent::from_sse(&frame) {
                Ok(Some(event)) => self.pending.push_back(Ok(event)),
                Ok(None) => {}
                Err(e) => self.pending.push_back(Err(e)),
            }
        }
    }
}

/// Decode a raw byte stream into typed events
pub fn decode_event_stream<S, B, E>(bytes: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    let state = DecodeState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    let stream = futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let frames = state.decoder.feed(chunk.as_ref());
                    state.push_frames(frames);
                }
                Some(Err(e)) => {
                    state
                        .pending
                        .push_back(Err(GemmaError::stream(format!("Stream error: {}", e))));
                    state.finished = true;
                }
                None => {
                    let last = state.decoder.finish();
                    state.push_frames(last);
                    state.finished = true;
                }
            }
        }
    });

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&'static str]) -> Vec<Result<&'static [u8], String>> {
        parts.iter().map(|p| Ok(p.as_bytes())).collect()
    }

    #[tokio::test]
    async fn test_decodes_events_across_chunk_boundaries() {
        let bytes = futures::stream::iter(chunks(&[
            "event: meta\ndata: {\"total\": 1}\n\nevent: res",
            "ult\ndata: {\"index\": 1, \"total\": 1}\n\n: ping\n\n",
            "event: done\ndata: {\"model\": \"gemma\"}",
        ]));

        let events: Vec<_> = decode_event_stream(bytes).collect().await;
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], Ok(StreamEvent::Meta(_))));
        assert!(matches!(events[1], Ok(StreamEvent::Result(_))));
        assert!(matches!(events[2], Ok(StreamEvent::Done(_))));
    }

    #[tokio::test]
    async fn test_transport_error_ends_the_stream() {
        let bytes = futures::stream::iter(vec![
            Ok("event: meta\ndata: {\"total\": 2}\n\n".as_bytes()),
            Err("connection reset".to_string()),
            Ok("event: done\ndata: {}\n\n".as_bytes()),
        ]);

        let events: Vec<_> = decode_event_stream(bytes).collect().await;
        assert_eq!(events.len(), 2);
        match &events[1] {
            Err(GemmaError::Stream { message }) => assert!(message.contains("connection reset")),
            other => panic!("unexpected item {other:?}"),
        }
    }
}
