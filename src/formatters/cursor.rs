//! Character cursor shared by one extraction pass.

use crate::models::Span;

/// Count of base-text characters emitted so far in one pass.
///
/// A cursor belongs to exactly one base text. Formatters create a fresh one
/// per unit and hold it by value, so two bases can never share it.
#[derive(Debug, Default)]
pub struct OffsetCursor {
    position: usize,
}

impl OffsetCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Consume `n` characters of literal text without annotating them.
    pub fn advance_by(&mut self, n: usize) {
        self.position += n;
    }

    /// Claim the next `length` characters as a span.
    pub fn emit_span(&mut self, length: usize) -> Span {
        let start = self.position;
        self.position += length;
        Span::new(start, self.position)
    }
}

/// A base text under construction, kept in lockstep with its cursor.
#[derive(Debug, Default)]
pub struct BaseTextWriter {
    cursor: OffsetCursor,
    text: String,
}

impl BaseTextWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Append text that carries no annotation.
    pub fn push_literal(&mut self, text: &str) {
        self.cursor.advance_by(text.chars().count());
        self.text.push_str(text);
    }

    /// Append text and return the span it occupies.
    pub fn push_span(&mut self, text: &str) -> Span {
        let span = self.cursor.emit_span(text.chars().count());
        self.text.push_str(text);
        span
    }

    pub fn finish(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_span_is_contiguous() {
        let mut cursor = OffsetCursor::new();
        let a = cursor.emit_span(3);
        cursor.advance_by(2);
        let b = cursor.emit_span(4);
        let c = cursor.emit_span(0);

        assert_eq!((a.start(), a.end()), (0, 3));
        assert_eq!((b.start(), b.end()), (5, 9));
        assert_eq!((c.start(), c.end()), (9, 9));
        assert_eq!(cursor.position(), 9);
    }

    #[test]
    fn test_cursor_never_moves_backwards() {
        let mut cursor = OffsetCursor::new();
        let mut last = cursor.position();
        for step in [0, 1, 5, 0, 2] {
            if step % 2 == 0 {
                cursor.advance_by(step);
            } else {
                cursor.emit_span(step);
            }
            assert!(cursor.position() >= last);
            last = cursor.position();
        }
    }

    #[test]
    fn test_writer_tracks_chars() {
        let mut writer = BaseTextWriter::new();
        writer.push_literal("བཀྲ་");
        let span = writer.push_span("ཤིས");
        writer.push_literal("\n");

        assert_eq!((span.start(), span.end()), (4, 7));
        assert_eq!(writer.position(), 8);
        let text = writer.finish();
        assert_eq!(text.chars().count(), 8);
    }
}
