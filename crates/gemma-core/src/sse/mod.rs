//! Server-Sent Events decoding
//!
//! A buffered parser for the analysis stream. It copes with:
//! - frames split across network chunks
//! - UTF-8 sequences split across chunk boundaries
//! - multi-line `data:` fields
//! - `\n` and `\r\n` line endings

mod event;

pub use event::SseEvent;

/// Buffered SSE decoder
///
/// ```text
/// event: result\n
/// data: {"index": 1, ...}\n
/// \n
/// ```
///
/// Frames are separated by a blank line. Comment lines (`:`) and `retry:` are ignored.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Decoded text not yet terminated by a blank line
    buffer: String,
    /// Trailing bytes of a UTF-8 sequence cut by the chunk boundary
    incomplete_utf8: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return every frame they complete
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let bytes_to_decode = if self.incomplete_utf8.is_empty() {
            chunk.to_vec()
        } else {
            let mut combined = std::mem::take(&mut self.incomplete_utf8);
            combined.extend_from_slice(chunk);
            combined
        };

        let (valid_str, remaining_bytes) = Self::decode_utf8_with_remainder(&bytes_to_decode);
        self.incomplete_utf8 = remaining_bytes;
        self.buffer.push_str(&valid_str);

        let mut events = Vec::new();
        while let Some((end, delimiter_len)) = self.find_event_boundary() {
            let event_text: String = self.buffer.drain(..end).collect();
            self.buffer.drain(..delimiter_len);

            if let Some(event) = Self::parse_event(&event_text) {
                events.push(event);
            }
        }

        events
    }

    /// Flush a final frame the server closed without a trailing blank line
    pub fn finish(&mut self) -> Option<SseEvent> {
        let text = std::mem::take(&mut self.buffer);
        self.incomplete_utf8.clear();
        Self::parse_event(&text)
    }

    /// Decode bytes as UTF-8, returning the valid prefix and any incomplete tail
    fn decode_utf8_with_remainder(bytes: &[u8]) -> (String, Vec<u8>) {
        if let Ok(s) = std::str::from_utf8(bytes) {
            return (s.to_string(), Vec::new());
        }

        let mut valid_end = bytes.len();
        for i in 1..=4.min(bytes.len()) {
            let pos = bytes.len() - i;
            let byte = bytes[pos];

            if !Self::is_continuation_byte(byte) {
                if bytes.len() - pos < Self::utf8_char_len(byte) {
                    valid_end = pos;
                }
                break;
            }
        }

        match std::str::from_utf8(&bytes[..valid_end]) {
            Ok(s) => (s.to_string(), bytes[valid_end..].to_vec()),
            Err(e) => {
                // Invalid bytes mid-chunk: keep the valid prefix, replace the rest
                let valid_up_to = e.valid_up_to();
                tracing::warn!(
                    position = valid_up_to,
                    "Invalid UTF-8 in event stream, replacing undecodable bytes"
                );
                let lossy = String::from_utf8_lossy(&bytes[..valid_end]).into_owned();
                (lossy, bytes[valid_end..].to_vec())
            }
        }
    }

    #[inline]
    fn is_continuation_byte(byte: u8) -> bool {
        (byte & 0b1100_0000) == 0b1000_0000
    }

    #[inline]
    fn utf8_char_len(first_byte: u8) -> usize {
        if first_byte & 0b1000_0000 == 0 {
            1
        } else if first_byte & 0b1110_0000 == 0b1100_0000 {
            2
        } else if first_byte & 0b1111_0000 == 0b1110_0000 {
            3
        } else if first_byte & 0b1111_1000 == 0b1111_0000 {
            4
        } else {
            1
        }
    }

    /// Position and length of the earliest blank-line delimiter
    fn find_event_boundary(&self) -> Option<(usize, usize)> {
        ["\r\n\r\n", "\n\n", "\r\r"]
            .iter()
            .filter_map(|delim| self.buffer.find(delim).map(|pos| (pos, delim.len())))
            .min_by_key(|(pos, _)| *pos)
    }

    fn parse_event(text: &str) -> Option<SseEvent> {
        let mut event_type: Option<String> = None;
        let mut data_lines: Vec<&str> = Vec::new();
        let mut id: Option<String> = None;

        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };

            match field {
                "event" => event_type = Some(value.trim().to_string()),
                "data" => data_lines.push(value),
                "id" => id = Some(value.trim().to_string()),
                _ => {}
            }
        }

        if data_lines.is_empty() && event_type.is_none() {
            return None;
        }

        Some(SseEvent {
            event_type,
            data: data_lines.join("\n"),
            id,
        })
    }

    /// Drop everything buffered
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.incomplete_utf8.clear();
    }

    /// Whether a partial frame is buffered
    pub fn has_remaining(&self) -> bool {
        !self.buffer.is_empty() || !self.incomplete_utf8.is_empty()
    }
}

#[cfg(test)]
mod tests;
