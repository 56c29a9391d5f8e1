//! Line framing for the `RadioRA` telnet protocol.
//!
//! The controller speaks CRLF-terminated text:
//! ```text
//! ~OUTPUT,5,1,75.00\r\n
//! GNET> \r\n
//! ```
//! Prompts (`login: `, `password: `, `GNET> `) are written without a
//! terminator and then the controller waits for input, so a buffered
//! partial line that ends in a known prompt is released as a line too.

use bytes::{Buf, BytesMut};

/// Line terminator used on the wire in both directions.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Prompts that are released without waiting for a terminator.
///
/// Compared against the lowercased, right-trimmed partial line.
pub const PROMPTS: &[&str] = &["login:", "password:", "gnet>"];

/// Longest unterminated line kept in the buffer.
pub const MAX_LINE_LEN: usize = 4096;

/// Line decoder that handles partial data.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: BytesMut,
}

impl LineDecoder {
    /// Creates a new line decoder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Feeds data into the decoder.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next line.
    ///
    /// Returns the line without its terminator, or `None` if more data is
    /// needed. Empty lines are skipped. Invalid UTF-8 is replaced lossily.
    pub fn decode(&mut self) -> Option<String> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let raw = self.buffer.split_to(pos);
                self.buffer.advance(1);

                let line = String::from_utf8_lossy(&raw);
                let line = line.trim_end_matches('\r');
                if line.trim().is_empty() {
                    continue;
                }
                return Some(line.to_owned());
            }

            return self.take_prompt();
        }
    }

    /// Releases the buffered partial line if it is a prompt.
    fn take_prompt(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }

        let partial = String::from_utf8_lossy(&self.buffer);
        let tail = partial.trim_end().to_ascii_lowercase();
        if !PROMPTS.iter().any(|prompt| tail.ends_with(prompt)) {
            return None;
        }

        let line = partial.into_owned();
        self.buffer.clear();
        Some(line)
    }

    /// Drops a buffered partial line longer than [`MAX_LINE_LEN`].
    ///
    /// Call after draining [`decode`](Self::decode), when only the partial
    /// line is left. Returns true if anything was dropped.
    pub fn discard_overflow(&mut self) -> bool {
        if self.buffer.len() <= MAX_LINE_LEN {
            return false;
        }
        self.buffer.clear();
        true
    }

    /// Returns the number of bytes currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_complete_line() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"~OUTPUT,5,1,75.00\r\n");

        assert_eq!(decoder.decode().as_deref(), Some("~OUTPUT,5,1,75.00"));
        assert_eq!(decoder.decode(), None);
    }

    #[test]
    fn test_decode_partial_line() {
        let mut decoder = LineDecoder::new();

        decoder.feed(b"~OUTPUT,5,");
        assert_eq!(decoder.decode(), None);
        assert_eq!(decoder.buffered(), 10);

        decoder.feed(b"1,75.00\r\n");
        assert_eq!(decoder.decode().as_deref(), Some("~OUTPUT,5,1,75.00"));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decode_multiple_lines_in_order() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"~OUTPUT,1,1,0.00\r\n~OUTPUT,2,1,100.00\r\n");

        assert_eq!(decoder.decode().as_deref(), Some("~OUTPUT,1,1,0.00"));
        assert_eq!(decoder.decode().as_deref(), Some("~OUTPUT,2,1,100.00"));
        assert_eq!(decoder.decode(), None);
    }

    #[test]
    fn test_decode_skips_blank_lines() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"\r\n\r\n~OUTPUT,1,1,0.00\r\n");

        assert_eq!(decoder.decode().as_deref(), Some("~OUTPUT,1,1,0.00"));
    }

    #[test]
    fn test_decode_releases_unterminated_prompts() {
        let mut decoder = LineDecoder::new();

        decoder.feed(b"login: ");
        assert_eq!(decoder.decode().as_deref(), Some("login: "));

        decoder.feed(b"password: ");
        assert_eq!(decoder.decode().as_deref(), Some("password: "));

        decoder.feed(b"GNET> ");
        assert_eq!(decoder.decode().as_deref(), Some("GNET> "));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decode_prompt_after_banner_line() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"RadioRA 2 Main Repeater\r\nLOGIN: ");

        assert_eq!(decoder.decode().as_deref(), Some("RadioRA 2 Main Repeater"));
        assert_eq!(decoder.decode().as_deref(), Some("LOGIN: "));
    }

    #[test]
    fn test_decode_holds_non_prompt_partial() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"~OUTPUT");

        assert_eq!(decoder.decode(), None);
        decoder.clear();
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_discard_overflow_drops_runaway_partial() {
        let mut decoder = LineDecoder::new();
        decoder.feed(&[b'x'; MAX_LINE_LEN]);
        assert_eq!(decoder.decode(), None);
        assert!(!decoder.discard_overflow());

        decoder.feed(b"xx");
        assert!(decoder.discard_overflow());
        assert_eq!(decoder.buffered(), 0);

        decoder.feed(b"~OUTPUT,1,1,5.00\r\n");
        assert_eq!(decoder.decode().as_deref(), Some("~OUTPUT,1,1,5.00"));
    }
}
