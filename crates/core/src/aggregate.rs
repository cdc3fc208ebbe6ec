//! Aggregate traits for the moderated entities.
//!
//! Every moderated record (supplier profile, buyer profile, product,
//! inquiry, account) is an aggregate: a pure decision function over
//! commands plus a deterministic state-evolution function over events.
//! Transition rules live here in the domain, never in HTTP handlers.

use crate::error::{DomainError, DomainResult};

/// Identity + stream position of an aggregate instance.
pub trait AggregateRoot {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Number of events applied so far (the stream revision).
    fn version(&self) -> u64;
}

/// Command handling and event application, both free of IO.
///
/// `handle` inspects state and decides; it never mutates. `apply` evolves
/// state from one event and must be deterministic, since the same events
/// are replayed on every rehydration. Rejected commands come back as the
/// aggregate's error type with no events emitted.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    fn apply(&mut self, event: &Self::Event);

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}

/// What stream revision a writer expects to find when appending.
///
/// `Exact` is the optimistic-concurrency guard: two admins acting on the
/// same entity race on the append, and the loser gets a conflict instead
/// of a silent last-write-wins.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    Any,
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "stream moved: expected {self:?}, found version {actual}"
            )))
        }
    }
}
