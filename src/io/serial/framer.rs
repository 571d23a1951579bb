// src/io/serial/framer.rs
//
// Newline framing for the serial byte stream.
// Reassembles arbitrarily fragmented reads into complete `\n`-terminated lines.

// =============================================================================
// Constants
// =============================================================================

/// Line terminator. No other delimiter or escaping is recognised.
pub const LINE_TERMINATOR: u8 = b'\n';

// =============================================================================
// Line Framer
// =============================================================================

/// Stateful line framer for streaming data.
///
/// Bytes are buffered until a terminator arrives; each terminator closes one
/// line (terminator excluded). After every `feed` the buffer holds at most one
/// partial, terminator-free fragment.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        LineFramer {
            buffer: Vec::with_capacity(256),
        }
    }

    /// Feed raw bytes into the framer.
    /// Returns every line completed by this chunk, in arrival order.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        // Only the new bytes can hold a terminator; the buffered tail never does
        let scan_from = self.buffer.len();
        self.buffer.extend_from_slice(data);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut pos = scan_from;
        while let Some(offset) = self.buffer[pos..]
            .iter()
            .position(|&b| b == LINE_TERMINATOR)
        {
            let end = pos + offset;
            lines.push(self.buffer[start..end].to_vec());
            start = end + 1;
            pos = start;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        lines
    }

    /// Discard any buffered partial line. Called on disconnect.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Bytes received since the last terminator.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference split: every `\n`-terminated piece of `data`, remainder excluded.
    fn reference_lines(data: &[u8]) -> Vec<Vec<u8>> {
        let mut parts: Vec<Vec<u8>> = data.split(|&b| b == b'\n').map(|p| p.to_vec()).collect();
        parts.pop();
        parts
    }

    fn feed_in_chunks(framer: &mut LineFramer, data: &[u8], chunk: usize) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        for piece in data.chunks(chunk) {
            out.extend(framer.feed(piece));
        }
        out
    }

    #[test]
    fn test_single_chunk_multiple_lines() {
        let mut framer = LineFramer::new();
        let lines = framer.feed(b"Hello\nWorld\n");
        assert_eq!(lines, vec![b"Hello".to_vec(), b"World".to_vec()]);
        assert!(framer.is_empty());
    }

    #[test]
    fn test_partial_tail_is_buffered() {
        let mut framer = LineFramer::new();
        assert!(framer.feed(b"Hel").is_empty());
        assert_eq!(framer.pending(), b"Hel");

        let lines = framer.feed(b"lo\nWor");
        assert_eq!(lines, vec![b"Hello".to_vec()]);
        assert_eq!(framer.pending(), b"Wor");
    }

    #[test]
    fn test_empty_lines_are_emitted() {
        let mut framer = LineFramer::new();
        let lines = framer.feed(b"\n\nx\n");
        assert_eq!(lines, vec![Vec::new(), Vec::new(), b"x".to_vec()]);
    }

    #[test]
    fn test_carriage_return_is_kept() {
        let mut framer = LineFramer::new();
        let lines = framer.feed(b"12\r\n");
        assert_eq!(lines, vec![b"12\r".to_vec()]);
    }

    #[test]
    fn test_empty_chunks_emit_nothing() {
        let mut framer = LineFramer::new();
        assert!(framer.feed(b"").is_empty());
        assert!(framer.feed(b"5").is_empty());
        assert!(framer.feed(b"").is_empty());
        assert!(framer.feed(b"").is_empty());
        assert_eq!(framer.feed(b"\n"), vec![b"5".to_vec()]);
    }

    #[test]
    fn test_any_chunking_matches_reference_split() {
        let data: &[u8] = b"100\n\n  7 \nabc\n-5\n3.2\n42\ntrailing";
        let expected = reference_lines(data);

        for chunk in 1..=data.len() {
            let mut framer = LineFramer::new();
            let lines = feed_in_chunks(&mut framer, data, chunk);
            assert_eq!(lines, expected, "chunk size {}", chunk);
            assert_eq!(framer.pending(), b"trailing", "chunk size {}", chunk);
        }
    }

    #[test]
    fn test_no_loss_no_duplication() {
        let data: &[u8] = b"a\nbb\n\nccc\ndd";
        let mut framer = LineFramer::new();
        let lines = feed_in_chunks(&mut framer, data, 3);

        let mut rebuilt = Vec::new();
        for line in &lines {
            rebuilt.extend_from_slice(line);
            rebuilt.push(b'\n');
        }
        rebuilt.extend_from_slice(framer.pending());
        assert_eq!(rebuilt, data);
    }

    #[test]
    fn test_reset_drops_partial_line() {
        let mut framer = LineFramer::new();
        assert!(framer.feed(b"12").is_empty());
        framer.reset();
        assert!(framer.is_empty());
        assert_eq!(framer.feed(b"3\n"), vec![b"3".to_vec()]);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut framer = LineFramer::new();
        framer.reset();
        framer.reset();
        assert!(framer.is_empty());

        let mut fresh = LineFramer::new();
        assert_eq!(framer.feed(b"99\n"), fresh.feed(b"99\n"));
    }

    #[test]
    fn test_fragmented_counter_scenario() {
        let mut framer = LineFramer::new();
        assert!(framer.feed(b"1").is_empty());
        assert_eq!(framer.feed(b"0\n2"), vec![b"10".to_vec()]);
        assert_eq!(framer.feed(b"0\n"), vec![b"20".to_vec()]);
        assert!(framer.is_empty());
    }
}
