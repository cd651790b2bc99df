//! Incremental server-sent-events reader for streamed completions.
//!
//! Bytes arrive in arbitrary chunks; only complete lines are decoded, so a
//! multi-byte character split across chunks is never mangled.

/// One event payload from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Data(String),
    /// The `data: [DONE]` terminator.
    Done,
}

#[derive(Debug, Default)]
pub struct SseBuffer {
    buf: Vec<u8>,
}

impl SseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and return the events completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(ev) = parse_line(&line) {
                events.push(ev);
            }
        }
        events
    }

    /// Flush a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let line = std::mem::take(&mut self.buf);
        parse_line(&line)
    }
}

fn parse_line(line: &[u8]) -> Option<SseEvent> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\n', '\r']);
    let payload = line.strip_prefix("data:")?.trim_start();
    if payload.is_empty() {
        return None;
    }
    if payload == "[DONE]" {
        Some(SseEvent::Done)
    } else {
        Some(SseEvent::Data(payload.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_split_across_chunks() {
        let mut buf = SseBuffer::new();
        assert!(buf.push(b"data: {\"a\"").is_empty());
        assert_eq!(
            buf.push(b":1}\r\n\ndata: [DONE]\n"),
            vec![SseEvent::Data("{\"a\":1}".to_string()), SseEvent::Done]
        );
    }

    #[test]
    fn comments_and_other_fields_are_ignored() {
        let mut buf = SseBuffer::new();
        let events = buf.push(b": keep-alive\nevent: message\nid: 7\ndata: x\n");
        assert_eq!(events, vec![SseEvent::Data("x".to_string())]);
    }

    #[test]
    fn multibyte_char_split_between_chunks() {
        let text = "data: café\n".as_bytes();
        let split = text.len() - 2;
        let mut buf = SseBuffer::new();
        assert!(buf.push(&text[..split]).is_empty());
        assert_eq!(buf.push(&text[split..]), vec![SseEvent::Data("café".to_string())]);
    }

    #[test]
    fn finish_flushes_unterminated_line() {
        let mut buf = SseBuffer::new();
        buf.push(b"data: tail");
        assert_eq!(buf.finish(), Some(SseEvent::Data("tail".to_string())));
        assert_eq!(buf.finish(), None);
    }
}
