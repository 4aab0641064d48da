//! Tests for the SSE decoder

use super::*;

#[test]
fn test_named_event() {
    let mut decoder = SseDecoder::new();
    let events = decoder.feed(b"event: meta\ndata: {\"total\": 3}\n\n");

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name(), "meta");
    assert_eq!(events[0].data, "{\"total\": 3}");
}

#[test]
fn test_unnamed_event_defaults_to_message() {
    let mut decoder = SseDecoder::new();
    let events = decoder.feed(b"data: hello\n\n");

    assert_eq!(events[0].event_type, None);
    assert_eq!(events[0].name(), "message");
}

#[test]
fn test_frame_split_across_chunks() {
    let mut decoder = SseDecoder::new();

    assert!(decoder.feed(b"event: result\ndata: {\"ind").is_empty());
    assert!(decoder.has_remaining());

    let events = decoder.feed(b"ex\": 1}\n\n");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data, "{\"index\": 1}");
    assert!(!decoder.has_remaining());
}

#[test]
fn test_multi_line_data() {
    let mut decoder = SseDecoder::new();
    let events = decoder.feed(b"data: line1\ndata: line2\n\n");
    assert_eq!(events[0].data, "line1\nline2");
}

#[test]
fn test_sequence_in_one_chunk_keeps_order() {
    let mut decoder = SseDecoder::new();
    let input = b"event: meta\ndata: {}\n\n\
        event: step\ndata: {\"index\": 1}\n\n\
        event: result\ndata: {\"index\": 1}\n\n\
        event: done\ndata: {}\n\n";

    let names: Vec<String> = decoder
        .feed(input)
        .into_iter()
        .map(|e| e.name().to_string())
        .collect();
    assert_eq!(names, vec!["meta", "step", "result", "done"]);
}

#[test]
fn test_windows_line_endings() {
    let mut decoder = SseDecoder::new();
    let events = decoder.feed(b"event: step\r\ndata: value\r\n\r\nevent: done\r\ndata: {}\r\n\r\n");

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].name(), "step");
    assert_eq!(events[0].data, "value");
}

#[test]
fn test_comments_and_retry_are_ignored() {
    let mut decoder = SseDecoder::new();
    let events = decoder.feed(b": keep-alive\n\nretry: 1000\ndata: x\n\n");

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data, "x");
}

#[test]
fn test_event_without_data_is_kept_when_named() {
    let mut decoder = SseDecoder::new();
    let events = decoder.feed(b"event: error\n\n");

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name(), "error");
    assert_eq!(events[0].data, "");
}

#[test]
fn test_id_field() {
    let mut decoder = SseDecoder::new();
    let events = decoder.feed(b"id: 7\nevent: result\ndata: {}\n\n");
    assert_eq!(events[0].id.as_deref(), Some("7"));
}

#[test]
fn test_utf8_split_across_chunks() {
    let mut decoder = SseDecoder::new();
    let text = "data: café résumé\n\n".as_bytes();
    // Split inside the two-byte 'é'
    let split = text.iter().position(|b| *b == 0xC3).unwrap() + 1;

    assert!(decoder.feed(&text[..split]).is_empty());
    let events = decoder.feed(&text[split..]);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data, "café résumé");
}

#[test]
fn test_finish_flushes_unterminated_frame() {
    let mut decoder = SseDecoder::new();
    assert!(decoder.feed(b"event: done\ndata: {}").is_empty());

    let last = decoder.finish().unwrap();
    assert_eq!(last.name(), "done");
    assert!(decoder.finish().is_none());
}
