//! Incremental decoder for the chat completions event stream.
//!
//! The response body arrives in arbitrary byte chunks. Only `data:` lines are
//! meaningful:
//! ```text
//! data: {"id":"...","choices":[{"delta":{"content":"Hel"}}]}
//!
//! data: {"id":"...","choices":[{"delta":{"content":"lo"}}]}
//!
//! data: [DONE]
//! ```
//! Every other line (blank keep-alives, `:` comments, `event:`/`id:` fields)
//! is skipped. A `data:` payload that is not a valid chunk is skipped too; it
//! never ends the stream.

use crate::types::ChatChunk;

/// Sentinel payload marking the end of generated content.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Upper bound for a buffered, not yet terminated line.
pub const MAX_PENDING_BYTES: usize = 1024 * 1024;

/// An event decoded from the stream body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// `choices[0].delta.content` of a `data:` payload.
    TextFragment(String),
    /// The `[DONE]` sentinel.
    Done,
}

/// Splits a chunked response body into lines and decodes `data:` lines.
///
/// Bytes after the last newline of a chunk are kept until the next chunk, so
/// lines and multi-byte characters split across chunk boundaries decode
/// intact.
///
/// A line that grows past [`MAX_PENDING_BYTES`] without a newline is dropped
/// as a whole, including the bytes that arrive after the limit was hit.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending: Vec<u8>,
    /// Inside a dropped line; skip up to the next newline.
    skipping: bool,
}

impl StreamDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the events of every line it completes.
    ///
    /// Events are in line order.
    pub fn parse_chunk(&mut self, mut chunk: &[u8]) -> Vec<SseEvent> {
        if self.skipping {
            let Some(end) = chunk.iter().position(|&b| b == b'\n') else {
                return Vec::new();
            };
            self.skipping = false;
            chunk = &chunk[end + 1..];
        }
        self.pending.extend_from_slice(chunk);

        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            self.discard_oversized();
            return Vec::new();
        };

        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);
        self.discard_oversized();

        complete
            .split(|&b| b == b'\n')
            .filter_map(parse_raw_line)
            .collect()
    }

    /// Decode whatever is left once the body has ended.
    ///
    /// A final line without a trailing newline is still a line.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        self.skipping = false;
        let rest = std::mem::take(&mut self.pending);
        parse_raw_line(&rest).into_iter().collect()
    }

    /// Number of bytes waiting for a newline.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn discard_oversized(&mut self) {
        if self.pending.len() > MAX_PENDING_BYTES {
            tracing::warn!(
                bytes = self.pending.len(),
                "discarding unterminated line over buffer limit"
            );
            self.pending.clear();
            self.skipping = true;
        }
    }
}

fn parse_raw_line(raw: &[u8]) -> Option<SseEvent> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    if raw.is_empty() {
        return None;
    }
    match std::str::from_utf8(raw) {
        Ok(line) => parse_line(line),
        Err(e) => {
            tracing::trace!(error = %e, "skipping line that is not UTF-8");
            None
        }
    }
}

/// Decode a single line (without its line terminator).
///
/// Returns `None` for anything that is not a `data:` line with either the
/// `[DONE]` sentinel or a chunk carrying content.
pub fn parse_line(line: &str) -> Option<SseEvent> {
    let (field, value) = line.split_once(':')?;
    if field.trim() != "data" {
        return None;
    }

    let value = value.trim();
    if value == DONE_SENTINEL {
        return Some(SseEvent::Done);
    }

    match serde_json::from_str::<ChatChunk>(value) {
        Ok(chunk) => chunk.into_content().map(SseEvent::TextFragment),
        Err(e) => {
            tracing::trace!(error = %e, "skipping undecodable data line");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(content: &str) -> String {
        format!(
            "data: {}\n",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    fn text(s: &str) -> SseEvent {
        SseEvent::TextFragment(s.into())
    }

    #[test]
    fn data_line_yields_fragment() {
        assert_eq!(
            parse_line(r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#),
            Some(text("Hel"))
        );
    }

    #[test]
    fn done_sentinel_yields_done() {
        assert_eq!(parse_line("data: [DONE]"), Some(SseEvent::Done));
        assert_eq!(parse_line("data:[DONE]  "), Some(SseEvent::Done));
    }

    #[test]
    fn other_fields_are_skipped() {
        assert_eq!(parse_line("event: message"), None);
        assert_eq!(parse_line("id: 42"), None);
        assert_eq!(parse_line(": keep-alive"), None);
        assert_eq!(parse_line("retry: 1000"), None);
        assert_eq!(parse_line("no colon at all"), None);
    }

    #[test]
    fn malformed_json_is_skipped() {
        assert_eq!(parse_line("data: {\"choices\":[{\"delta\""), None);
        assert_eq!(parse_line("data: not json"), None);
        assert_eq!(parse_line("data:"), None);
    }

    #[test]
    fn role_only_and_null_content_are_skipped() {
        assert_eq!(
            parse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            None
        );
        assert_eq!(
            parse_line(r#"data: {"choices":[{"delta":{"content":null}}]}"#),
            None
        );
    }

    #[test]
    fn empty_content_is_still_a_fragment() {
        assert_eq!(
            parse_line(r#"data: {"choices":[{"delta":{"role":"assistant","content":""}}]}"#),
            Some(text(""))
        );
    }

    #[test]
    fn colon_inside_payload_is_kept() {
        assert_eq!(
            parse_line(r#"data: {"choices":[{"delta":{"content":"a: b"}}]}"#),
            Some(text("a: b"))
        );
    }

    #[test]
    fn chunk_with_several_lines_preserves_order() {
        let mut decoder = StreamDecoder::new();
        let chunk = format!("{}\n{}: ping\n{}data: [DONE]\n", data("a"), "", data("b"));
        assert_eq!(
            decoder.parse_chunk(chunk.as_bytes()),
            vec![text("a"), text("b"), SseEvent::Done]
        );
    }

    #[test]
    fn blank_lines_yield_nothing() {
        let mut decoder = StreamDecoder::new();
        assert!(decoder.parse_chunk(b"\n\n\r\n\n").is_empty());
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let mut decoder = StreamDecoder::new();
        let chunk = data("x").replace('\n', "\r\n");
        assert_eq!(decoder.parse_chunk(chunk.as_bytes()), vec![text("x")]);
    }

    #[test]
    fn line_split_across_chunks_is_reassembled() {
        let mut decoder = StreamDecoder::new();
        let line = data("Hello");
        let (head, tail) = line.split_at(17);
        assert!(decoder.parse_chunk(head.as_bytes()).is_empty());
        assert_eq!(decoder.pending_len(), head.len());
        assert_eq!(decoder.parse_chunk(tail.as_bytes()), vec![text("Hello")]);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let mut decoder = StreamDecoder::new();
        let line = data("héllo ☃");
        let bytes = line.as_bytes();
        let snowman = line.find('☃').unwrap();
        // Cut inside the three-byte snowman.
        assert!(decoder.parse_chunk(&bytes[..snowman + 1]).is_empty());
        assert_eq!(
            decoder.parse_chunk(&bytes[snowman + 1..]),
            vec![text("héllo ☃")]
        );
    }

    #[test]
    fn invalid_utf8_line_is_skipped_without_losing_neighbours() {
        let mut decoder = StreamDecoder::new();
        let mut chunk = data("a").into_bytes();
        chunk.extend_from_slice(b"data: \xff\xfe\n");
        chunk.extend_from_slice(data("b").as_bytes());
        assert_eq!(decoder.parse_chunk(&chunk), vec![text("a"), text("b")]);
    }

    #[test]
    fn finish_flushes_unterminated_line() {
        let mut decoder = StreamDecoder::new();
        assert!(decoder.parse_chunk(b"data: [DONE]").is_empty());
        assert_eq!(decoder.finish(), vec![SseEvent::Done]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn oversized_partial_line_is_discarded() {
        let mut decoder = StreamDecoder::new();
        let junk = vec![b'x'; MAX_PENDING_BYTES + 1];
        assert!(decoder.parse_chunk(&junk).is_empty());
        assert_eq!(decoder.pending_len(), 0);

        // Later lines still decode.
        assert!(decoder.parse_chunk(b"\n").is_empty());
        assert_eq!(decoder.parse_chunk(data("ok").as_bytes()), vec![text("ok")]);
    }

    #[test]
    fn rest_of_oversized_line_is_not_decoded() {
        let mut decoder = StreamDecoder::new();
        let mut head = b"data: ".to_vec();
        head.resize(MAX_PENDING_BYTES + 1, b'x');
        assert!(decoder.parse_chunk(&head).is_empty());

        // Everything up to the next newline still belongs to the dropped
        // line, even text that would decode on its own.
        assert!(decoder.parse_chunk(b"xxxx").is_empty());
        assert_eq!(decoder.pending_len(), 0);
        let next = format!("{}{}", data("dropped"), data("kept"));
        assert_eq!(decoder.parse_chunk(next.as_bytes()), vec![text("kept")]);
    }

    #[test]
    fn finish_inside_dropped_line_yields_nothing() {
        let mut decoder = StreamDecoder::new();
        let junk = vec![b'x'; MAX_PENDING_BYTES + 1];
        assert!(decoder.parse_chunk(&junk).is_empty());
        assert!(decoder.parse_chunk(b"data: [DONE]").is_empty());
        assert!(decoder.finish().is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn body_for(contents: &[String]) -> String {
        let mut body = String::new();
        for content in contents {
            body.push_str(&format!(
                "data: {}\n\n",
                serde_json::json!({"choices": [{"delta": {"content": content}}]})
            ));
        }
        body.push_str("data: [DONE]\n\n");
        body
    }

    proptest! {
        #[test]
        fn any_content_roundtrips_through_a_data_line(content in any::<String>()) {
            let line = format!(
                "data: {}",
                serde_json::json!({"choices": [{"delta": {"content": content}}]})
            );
            prop_assert_eq!(parse_line(&line), Some(SseEvent::TextFragment(content)));
        }

        #[test]
        fn chunk_boundaries_do_not_change_events(
            contents in proptest::collection::vec(any::<String>(), 0..8),
            cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..6),
        ) {
            let body = body_for(&contents);
            let bytes = body.as_bytes();

            let mut points: Vec<usize> = cuts.iter().map(|i| i.index(bytes.len() + 1)).collect();
            points.push(0);
            points.push(bytes.len());
            points.sort_unstable();

            let mut decoder = StreamDecoder::new();
            let mut events = Vec::new();
            for pair in points.windows(2) {
                events.extend(decoder.parse_chunk(&bytes[pair[0]..pair[1]]));
            }
            events.extend(decoder.finish());

            let mut expected: Vec<SseEvent> =
                contents.into_iter().map(SseEvent::TextFragment).collect();
            expected.push(SseEvent::Done);
            prop_assert_eq!(events, expected);
        }
    }
}
