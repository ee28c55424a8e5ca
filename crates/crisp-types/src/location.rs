//! Source positions attached to AST nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A point in source text.
///
/// `line` is 1-based, `col` is 0-based and counted in bytes from the start
/// of the line, `offset` is the byte offset from the start of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub col: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, col: usize, offset: usize) -> Self {
        Self { line, col, offset }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self { line: 1, col: 0, offset: 0 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// A half-open source range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Location {
    pub start: Position,
    pub end: Position,
}

impl Location {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// True if `(line, col)` falls inside this range, end inclusive.
    ///
    /// Inclusive end lets a cursor sitting right after the last character
    /// of a word count as "in" that word.
    pub fn contains(&self, line: usize, col: usize) -> bool {
        let point = (line, col);
        (self.start.line, self.start.col) <= point && point <= (self.end.line, self.end.col)
    }

    /// Smallest range covering both.
    pub fn cover(&self, other: &Location) -> Location {
        Location {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(sl: usize, sc: usize, el: usize, ec: usize) -> Location {
        Location::new(Position::new(sl, sc, 0), Position::new(el, ec, 0))
    }

    #[test]
    fn contains_is_end_inclusive() {
        let l = loc(2, 4, 2, 7);
        assert!(l.contains(2, 4));
        assert!(l.contains(2, 7));
        assert!(!l.contains(2, 8));
        assert!(!l.contains(1, 5));
    }

    #[test]
    fn multi_line_contains() {
        let l = loc(1, 10, 3, 1);
        assert!(l.contains(2, 0));
        assert!(l.contains(2, 99));
        assert!(!l.contains(3, 2));
    }
}
