//! Versioned state holders and the write expectation used by stores.

/// Something with a stable identity whose state is versioned.
pub trait AggregateRoot {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Count of events folded into this state since it was created.
    fn version(&self) -> u64;
}

/// Revision a writer believes the target is at.
///
/// Stores treat revision `0` as "nothing written yet", so `Exact(0)` means
/// "only write if the key is absent".
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Write unconditionally.
    Any,
    /// Write only if the current revision equals this one.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }
}

/// State that changes only through commands turned into events.
///
/// `handle` validates a command against the current state and returns the
/// events it implies (possibly none); it never mutates. `apply` folds one
/// accepted event into the state and cannot fail. Neither touches storage:
/// the ledger decides, applies to a copy, and persists the copy.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    fn apply(&mut self, event: &Self::Event);

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_zero_means_absent() {
        assert!(ExpectedVersion::Exact(0).matches(0));
        assert!(!ExpectedVersion::Exact(0).matches(3));
        assert!(ExpectedVersion::Any.matches(42));
    }
}
