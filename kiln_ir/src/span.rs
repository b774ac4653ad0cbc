//! Source location spans.

/// A byte-offset span into one object's source text.
///
/// Layout: 8 bytes (`start`, `end`), both exclusive-end byte offsets.
/// Line/column are recovered from `(object_index, byte_offset)` by a
/// collaborator outside the core (the reporter), per spec §6.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Dummy span for synthesized nodes (e.g. autogenerated pass/defer calls).
    pub const DUMMY: Span = Span { start: 0, end: 0 };

    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Span { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    #[must_use]
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A source object index: which translation unit a `Span` belongs to.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, PartialOrd, Ord)]
pub struct ObjectIndex(pub u32);

/// A fully-qualified source location, as handed to the reporting collaborator.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct SourceLocation {
    pub object: ObjectIndex,
    pub span: Span,
}
