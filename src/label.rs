use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_LABEL_ID: AtomicU64 = AtomicU64::new(0);

/// A position in the code of a method.
///
/// Labels are plain identifiers: the byte offset they stand for is only known to whoever lays
/// out the code (the reader while decoding, the writer while encoding). Every call to
/// [`Label::new`] returns a label distinct from all others in the process, so labels from
/// different methods or readers never collide.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label(u64);

impl Label {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Label {
        Label(NEXT_LABEL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Debug for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{}", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::Label;

    #[test]
    fn test_labels_are_distinct() {
        let a = Label::new();
        let b = Label::new();
        assert_ne!(a, b);
        assert_eq!(a, a);
    }
}
