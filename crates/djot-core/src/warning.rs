use crate::source_map::Range;

/// Recoverable conditions surfaced alongside a best-effort render.
///
/// Structural ambiguity is never reported: unrecognized syntax degrades to
/// literal text silently. Only the conditions a caller can act on get a
/// warning record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WarningKind {
    /// A `[text][label]` or `[^label]` reference with no matching definition.
    DanglingReference,
    /// A second definition for an already-defined label; the first wins.
    DuplicateReferenceLabel,
    /// A code or div fence with no closer; it runs to end of input.
    UnclosedFence,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Warning {
    pub kind: WarningKind,
    pub range: Range,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, range: Range, message: impl Into<String>) -> Self {
        Self {
            kind,
            range,
            message: message.into(),
        }
    }
}
