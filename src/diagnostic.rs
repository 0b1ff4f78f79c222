//! The warning/diagnostic model: spans, severities, and source ranges.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use url::Url;

/// A byte offset span within a single document's contents.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    /// The start of the span, inclusive.
    start: usize,
    /// The end of the span, exclusive.
    end: usize,
}

impl Span {
    /// Creates a new span from a start offset and a length.
    pub const fn new(start: usize, len: usize) -> Self {
        Self {
            start,
            end: start + len,
        }
    }

    /// Creates a new span from a start and end offset.
    pub const fn from_offsets(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Gets the start of the span.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Gets the noninclusive end of the span.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Gets the length of the span.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Determines if the span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Determines if the span contains the given offset.
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{start}..{end}", start = self.start, end = self.end)
    }
}

/// A zero-based line/column position within a document.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct SourcePosition {
    /// The zero-based line number.
    pub line: u32,
    /// The zero-based column (UTF-8 byte offset from the start of the line).
    pub column: u32,
}

impl SourcePosition {
    /// Creates a new source position.
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A source range expressed in line/column terms for a specific file.
///
/// Produced from a [`Span`] by a [`crate::line_map::LineMap`]; inline
/// documents have their `locationOffset` already folded into `start`/`end`
/// by the time a `SourceRange` is constructed, so callers never need to
/// re-translate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRange {
    /// The file the range is within.
    pub file: Arc<Url>,
    /// The inclusive start position.
    pub start: SourcePosition,
    /// The exclusive end position.
    pub end: SourcePosition,
}

impl SourceRange {
    /// Creates a new source range.
    pub fn new(file: Arc<Url>, start: SourcePosition, end: SourcePosition) -> Self {
        Self { file, start, end }
    }
}

/// The severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum Severity {
    /// An error: the analysis result for the containing document is
    /// incomplete or incorrect in some specific, named way.
    Error,
    /// A warning: something worth flagging, but analysis proceeded normally.
    Warning,
    /// Informational only.
    Info,
}

/// A warning (in the general sense — see [`Severity`]) attached to a
/// document as a result of loading, parsing, scanning, or resolving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// A short machine-readable code, e.g. `could-not-load`.
    code: String,
    /// A human-readable message.
    message: String,
    /// The severity of the warning.
    severity: Severity,
    /// Where in the source the warning applies.
    source_range: SourceRange,
}

impl Warning {
    /// Creates a new warning.
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        source_range: SourceRange,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            severity,
            source_range,
        }
    }

    /// Creates an error-severity warning.
    pub fn error(
        code: impl Into<String>,
        message: impl Into<String>,
        source_range: SourceRange,
    ) -> Self {
        Self::new(code, message, Severity::Error, source_range)
    }

    /// Sets the severity of the warning, returning the updated warning.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Gets the warning's code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Gets the warning's message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Gets the warning's severity.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Gets the warning's source range.
    pub fn source_range(&self) -> &SourceRange {
        &self.source_range
    }

    /// Converts this warning to a `codespan_reporting` diagnostic for
    /// pretty-printing.
    #[cfg(feature = "codespan")]
    pub fn to_codespan(&self) -> codespan_reporting::diagnostic::Diagnostic<()> {
        use codespan_reporting::diagnostic as codespan;

        let mut diagnostic = match self.severity {
            Severity::Error => codespan::Diagnostic::error(),
            Severity::Warning => codespan::Diagnostic::warning(),
            Severity::Info => codespan::Diagnostic::note(),
        };

        diagnostic.code = Some(self.code.clone());
        diagnostic.message.clone_from(&self.message);
        diagnostic
    }
}

impl Ord for Warning {
    fn cmp(&self, other: &Self) -> Ordering {
        self.source_range
            .start
            .cmp(&other.source_range.start)
            .then_with(|| self.code.cmp(&other.code))
            .then_with(|| self.message.cmp(&other.message))
    }
}

impl PartialOrd for Warning {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn span_contains_is_half_open() {
        let span = Span::new(4, 3);
        assert!(!span.contains(3));
        assert!(span.contains(4));
        assert!(span.contains(6));
        assert!(!span.contains(7));
    }

    #[test]
    fn warnings_sort_by_position_then_code() {
        let file = Arc::new(Url::parse("file:///a.html").unwrap());
        let range = |line| SourceRange::new(
            file.clone(),
            SourcePosition::new(line, 0),
            SourcePosition::new(line, 1),
        );

        let mut warnings = vec![
            Warning::error("b-code", "later", range(2)),
            Warning::error("a-code", "earlier", range(1)),
        ];
        warnings.sort();
        assert_eq!(warnings[0].code(), "a-code");
        assert_eq!(warnings[1].code(), "b-code");
    }
}
