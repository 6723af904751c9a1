use std::fmt::Display;

/// A location within source text: byte offset plus 1-based row and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct Position {
    /// Byte offset from the start of the source.
    pub pos: usize,
    /// 1-based line number.
    pub row: usize,
    /// 1-based column number.
    pub col: usize,
}

impl Position {
    /// Constructs a position from its raw parts.
    pub fn new(pos: usize, row: usize, col: usize) -> Self {
        Position { pos, row, col }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.row, self.col)
    }
}

/// The span of source text covered by a token, node or error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct PositionRange {
    /// Position of the first character.
    pub start: Position,
    /// Position one past the last character.
    pub end: Position,
}

impl PositionRange {
    /// Constructs a range from its two ends.
    pub fn new(start: Position, end: Position) -> Self {
        PositionRange { start, end }
    }

    /// A zero-width range anchored at a single position.
    pub fn at(position: Position) -> Self {
        PositionRange {
            start: position,
            end: position,
        }
    }

    /// The smallest range covering both `self` and `other`.
    pub fn span_to(&self, other: &PositionRange) -> Self {
        PositionRange {
            start: self.start,
            end: other.end,
        }
    }
}

impl Display for PositionRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.start)
    }
}
