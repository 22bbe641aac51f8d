//! Source positions and spans.
//!
//! Spans are byte ranges into the request's source text together with the
//! 1-based line/column of their start, so diagnostics never need the
//! source to be re-scanned when they are rendered.

use serde::Serialize;

/// A point in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Position {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column, counted in characters.
    pub column: u32,
    /// Byte offset from the start of the source.
    pub offset: u32,
}

impl Position {
    pub const fn new(line: u32, column: u32, offset: u32) -> Self {
        Position {
            line,
            column,
            offset,
        }
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Half-open byte range `[start, end)` plus the position of `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: Position,
    pub end: u32,
}

impl Span {
    pub const fn new(start: Position, end: u32) -> Self {
        Span { start, end }
    }

    /// Empty span located at `pos`.
    pub const fn point(pos: Position) -> Self {
        Span {
            start: pos,
            end: pos.offset,
        }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        let start = if other.start.offset < self.start.offset {
            other.start
        } else {
            self.start
        };
        Span {
            start,
            end: self.end.max(other.end),
        }
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.start.offset <= other.start.offset && other.end <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_spans_in_either_order() {
        let a = Span::new(Position::new(1, 1, 0), 3);
        let b = Span::new(Position::new(1, 5, 4), 9);
        assert_eq!(a.to(b), Span::new(Position::new(1, 1, 0), 9));
        assert_eq!(b.to(a), Span::new(Position::new(1, 1, 0), 9));
        assert!(a.to(b).contains(&a));
        assert!(a.to(b).contains(&b));
    }
}
