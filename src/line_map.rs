//! Offset↔position translation for parsed document contents.
//!
//! Backed by [`line_index::LineIndex`] for the O(log n) newline lookup.

use line_index::LineCol;
use line_index::LineIndex;
use line_index::TextSize;

use crate::diagnostic::SourcePosition;
use crate::diagnostic::Span;

/// A (line, column) translation applied to every source range produced for
/// an inline document, so that its ranges remain accurate host-file
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocationOffset {
    /// The line within the host document where the inline document begins.
    pub line: u32,
    /// The column within that line where the inline document begins.
    pub column: u32,
}

impl LocationOffset {
    /// Creates a new location offset.
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// The identity offset (no translation), used for top-level documents.
    pub const fn none() -> Self {
        Self { line: 0, column: 0 }
    }

    /// Applies this offset to a position local to the inline document.
    fn apply(&self, position: SourcePosition) -> SourcePosition {
        if position.line == 0 {
            SourcePosition::new(self.line, self.column + position.column)
        } else {
            SourcePosition::new(self.line + position.line, position.column)
        }
    }

    /// Removes this offset from a host-coordinate position, recovering the
    /// position local to the inline document.
    ///
    /// Returns `None` if the position lies before the offset (i.e. outside
    /// the inline document entirely).
    fn remove(&self, position: SourcePosition) -> Option<SourcePosition> {
        if position.line < self.line {
            return None;
        }
        if position.line == self.line {
            let column = position.column.checked_sub(self.column)?;
            Some(SourcePosition::new(0, column))
        } else {
            Some(SourcePosition::new(position.line - self.line, position.column))
        }
    }
}

/// Translates between byte offsets and `(line, column)` positions within a
/// single document's contents, with an optional [`LocationOffset`] applied
/// for inline documents.
#[derive(Debug)]
pub struct LineMap {
    /// The underlying newline index.
    index: LineIndex,
    /// The translation applied to produced positions.
    offset: LocationOffset,
    /// The length of the contents, used to validate offsets.
    len: usize,
}

impl LineMap {
    /// Builds a line map over the given contents.
    pub fn new(contents: &str, offset: LocationOffset) -> Self {
        Self {
            index: LineIndex::new(contents),
            offset,
            len: contents.len(),
        }
    }

    /// Translates a byte offset to a host-coordinate source position.
    ///
    /// Panics if `offset` is not a valid offset into the contents (greater
    /// than the length); this mirrors the invariant that callers only ever
    /// translate offsets that came from the same parse.
    pub fn offset_to_source_position(&self, offset: usize) -> SourcePosition {
        assert!(offset <= self.len, "offset out of range");
        let line_col = self.index.line_col(TextSize::from(offset as u32));
        self.offset.apply(SourcePosition::new(line_col.line, line_col.col))
    }

    /// Translates a host-coordinate source position back to a byte offset.
    ///
    /// Returns `None` if the position does not correspond to a valid offset
    /// (outside the inline document's offset range, or past the end of the
    /// document).
    pub fn source_position_to_offset(&self, position: SourcePosition) -> Option<usize> {
        let local = self.offset.remove(position)?;
        let line_col = LineCol {
            line: local.line,
            col: local.column,
        };
        let offset: usize = self.index.offset(line_col)?.into();
        (offset <= self.len).then_some(offset)
    }

    /// Translates a [`Span`] to a host-coordinate source range.
    pub fn offsets_to_source_range(&self, span: Span) -> (SourcePosition, SourcePosition) {
        (
            self.offset_to_source_position(span.start()),
            self.offset_to_source_position(span.end()),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_every_offset_in_a_top_level_document() {
        let contents = "line one\nline two\nline three";
        let map = LineMap::new(contents, LocationOffset::none());

        for offset in 0..=contents.len() {
            let position = map.offset_to_source_position(offset);
            let recovered = map
                .source_position_to_offset(position)
                .expect("position should map back to an offset");
            assert_eq!(recovered, offset, "offset {offset} did not round-trip");
        }
    }

    #[test]
    fn location_offset_shifts_the_first_line_only() {
        let contents = "var y = 1;\nvar z = 2;";
        let map = LineMap::new(contents, LocationOffset::new(3, 20));

        // Offset 0 is on the inline document's first line: column shifts.
        let start = map.offset_to_source_position(0);
        assert_eq!(start, SourcePosition::new(3, 20));

        // An offset on the inline document's second line: only the line shifts.
        let second_line_offset = contents.find('\n').unwrap() + 1;
        let second_line_start = map.offset_to_source_position(second_line_offset);
        assert_eq!(second_line_start, SourcePosition::new(4, 0));
    }

    #[test]
    fn round_trips_with_a_location_offset() {
        let contents = "a();\nb();\nc();";
        let offset = LocationOffset::new(10, 4);
        let map = LineMap::new(contents, offset);

        for local_offset in 0..=contents.len() {
            let position = map.offset_to_source_position(local_offset);
            let recovered = map
                .source_position_to_offset(position)
                .expect("position should map back to an offset");
            assert_eq!(recovered, local_offset);
        }
    }
}
