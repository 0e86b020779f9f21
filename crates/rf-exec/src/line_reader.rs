//! Incremental byte-stream to line decoder.

/// Decodes a byte stream into complete text lines, one chunk at a time.
///
/// Chunks may arrive at arbitrary boundaries, including in the middle of a
/// line or a multi-byte UTF-8 sequence. The reader buffers raw bytes and only
/// splits on `\n`, so a split character is reassembled before decoding.
/// Decoding is lossy per line; a trailing `\r` is stripped.
///
/// One instance serves exactly one stream. Call [`LineReader::finish`] at
/// end-of-stream to flush a non-empty residual buffer as the final line.
#[derive(Debug, Default)]
pub struct LineReader {
    buf: Vec<u8>,
}

impl LineReader {
    /// Create an empty reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns every line completed by this chunk, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let rest = self.buf.split_off(pos + 1);
            self.buf.pop(); // the newline itself
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
            lines.push(String::from_utf8_lossy(&self.buf).into_owned());
            self.buf = rest;
        }
        lines
    }

    /// Signal end-of-stream, flushing any residual bytes as one final line.
    pub fn finish(self) -> Option<String> {
        if self.buf.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.buf).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_across_chunk_boundaries() {
        let mut reader = LineReader::new();
        assert!(reader.push(b"ab").is_empty());
        assert_eq!(reader.push(b"c\nde"), vec!["abc"]);
        assert!(reader.push(b"f").is_empty());
        assert_eq!(reader.finish(), Some("def".to_string()));
    }

    #[test]
    fn multiple_lines_in_one_chunk() {
        let mut reader = LineReader::new();
        assert_eq!(reader.push(b"one\ntwo\nthr"), vec!["one", "two"]);
        assert_eq!(reader.push(b"ee\n"), vec!["three"]);
        assert_eq!(reader.finish(), None);
    }

    #[test]
    fn crlf_is_stripped() {
        let mut reader = LineReader::new();
        assert_eq!(reader.push(b"MSG:1\r\nDRV:0\r\n"), vec!["MSG:1", "DRV:0"]);
    }

    #[test]
    fn split_multibyte_character_survives() {
        // "é" is 0xC3 0xA9; split it across two chunks.
        let mut reader = LineReader::new();
        assert!(reader.push(&[0xC3]).is_empty());
        assert_eq!(reader.push(&[0xA9, b'\n']), vec!["é"]);
    }

    #[test]
    fn empty_lines_are_preserved() {
        let mut reader = LineReader::new();
        assert_eq!(reader.push(b"a\n\nb\n"), vec!["a", "", "b"]);
    }

    #[test]
    fn empty_stream_flushes_nothing() {
        let reader = LineReader::new();
        assert_eq!(reader.finish(), None);
    }
}
