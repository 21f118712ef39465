use std::fmt;

/// Opaque position marker inside an [`super::InsnList`]
///
/// Labels are only meaningful within the method body that allocated them. Branches and exception
/// handlers refer to labels rather than byte offsets, so instructions can be added and removed
/// without any fixups.
#[derive(Copy, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct Label(u32);

impl Label {
    /// Label for the first position in the method
    pub const START: Label = Label(0);

    /// Get the next fresh label
    pub fn next(&self) -> Label {
        Label(self.0 + 1)
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("l{}", self.0))
    }
}
