//! Source locations inside a formula string

/// Byte range of a token within the formula it was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width span at the given position
    pub fn at(position: usize) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    /// Smallest span covering both
    pub fn to(self, other: Span) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}
