//! The buffered source reader.
//!
//! A [`SourceReader`] owns one contiguous byte buffer and the position state
//! needed for diagnostics: `pos`, the 1-based `line`, and `lpos`, the offset
//! of the last line break (columns are `pos - lpos`). Buffers move between
//! readers only through [`SourceReader::consume`], which transfers ownership
//! and leaves the source empty — the file/macro stack in the lexer is built
//! entirely out of that operation.

use cppdef_util::FileId;

/// A positioned byte buffer.
#[derive(Debug, Default)]
pub struct SourceReader {
    data: Vec<u8>,
    /// Current byte offset.
    pub pos: usize,
    /// Current line, 1-based.
    pub line: u32,
    /// Offset of the most recent line break; column = `pos - lpos`.
    pub lpos: usize,
    /// The buffer's identity in the source map.
    pub file: FileId,
}

impl SourceReader {
    /// Create a reader over the given text.
    pub fn new(file: FileId, text: impl Into<Vec<u8>>) -> Self {
        Self {
            data: text.into(),
            pos: 0,
            line: 1,
            lpos: 0,
            file,
        }
    }

    /// An empty reader; useful as a swap target.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Buffer length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the position has reached the end of the buffer.
    #[inline]
    pub fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// The byte at `pos + offset`, or 0 past the end.
    #[inline]
    pub fn at(&self, offset: usize) -> u8 {
        *self.data.get(self.pos + offset).unwrap_or(&0)
    }

    /// The current byte, or 0 at the end.
    #[inline]
    pub fn current(&self) -> u8 {
        self.at(0)
    }

    /// Column of an absolute offset, 1-based at line start.
    #[inline]
    pub fn col_of(&self, offset: usize) -> u32 {
        offset.saturating_sub(self.lpos) as u32
    }

    /// Borrow `[start, end)` of the buffer as text.
    ///
    /// Invalid UTF-8 is replaced lossily only in the rare non-ASCII case;
    /// token boundaries are always ASCII.
    pub fn slice_str(&self, start: usize, end: usize) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data[start..end])
    }

    /// Take ownership of another reader's buffer and position, leaving the
    /// source empty.
    pub fn consume(&mut self, other: &mut SourceReader) {
        self.data = std::mem::take(&mut other.data);
        self.pos = other.pos;
        self.line = other.line;
        self.lpos = other.lpos;
        self.file = other.file;
        other.pos = 0;
        other.line = 1;
        other.lpos = 0;
    }

    /// Count a line break at the current position. Handles `\n`, `\r` and
    /// `\r\n` as a single break; leaves `pos` on the break's last byte.
    pub fn count_newline(&mut self) {
        debug_assert!(matches!(self.current(), b'\n' | b'\r'));
        if self.current() == b'\r' && self.at(1) == b'\n' {
            self.pos += 1;
        }
        self.line += 1;
        self.lpos = self.pos;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_bytes_with_zero_padding() {
        let r = SourceReader::new(FileId(0), "ab");
        assert_eq!(r.current(), b'a');
        assert_eq!(r.at(1), b'b');
        assert_eq!(r.at(2), 0);
        assert!(!r.at_end());
    }

    #[test]
    fn consume_moves_ownership() {
        let mut a = SourceReader::new(FileId(1), "hello");
        a.pos = 3;
        a.line = 2;
        let mut b = SourceReader::empty();
        b.consume(&mut a);
        assert_eq!(b.len(), 5);
        assert_eq!(b.pos, 3);
        assert_eq!(b.line, 2);
        assert_eq!(b.file, FileId(1));
        assert!(a.is_empty());
        assert_eq!(a.pos, 0);
    }

    #[test]
    fn newline_variants_count_once() {
        for text in ["a\nb", "a\rb", "a\r\nb"] {
            let mut r = SourceReader::new(FileId(0), text);
            r.pos = 1;
            r.count_newline();
            r.pos += 1;
            assert_eq!(r.line, 2, "input {text:?}");
            assert_eq!(r.current(), b'b', "input {text:?}");
            assert_eq!(r.col_of(r.pos), 1, "input {text:?}");
        }
    }

    #[test]
    fn slice_str_round_trips_ascii() {
        let r = SourceReader::new(FileId(0), "int foo;");
        assert_eq!(r.slice_str(4, 7), "foo");
    }
}
