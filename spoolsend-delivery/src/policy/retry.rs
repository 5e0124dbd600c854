//! Three-stage retry escalation
//!
//! A message gets three attempts in total. Each failure moves it one stage
//! forward; success at any stage, or failure at the last one, removes it.
//!
//! | claimed from | delivered | failed                 |
//! |--------------|-----------|------------------------|
//! | pending      | delete    | requeue as retry-once  |
//! | retry-once   | delete    | requeue as retry-final |
//! | retry-final  | delete    | delete (give up)       |

use spoolsend_spool::SpoolState;

/// What to do with a claimed entry once its attempt has an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Remove the in-flight file
    Delete,
    /// Rename the in-flight file into this waiting state
    Requeue(SpoolState),
}

impl Transition {
    /// Whether this transition discards a message that was never delivered
    #[must_use]
    pub const fn abandons(self, delivered: bool) -> bool {
        !delivered && matches!(self, Self::Delete)
    }
}

/// Decide the next durable state for an entry claimed from `prior`
///
/// An entry can only be claimed out of the in-flight state by stale
/// recovery, which already counts as its final attempt.
#[must_use]
pub const fn transition(prior: SpoolState, delivered: bool) -> Transition {
    if delivered {
        return Transition::Delete;
    }

    match prior {
        SpoolState::Pending => Transition::Requeue(SpoolState::RetryOnce),
        SpoolState::RetryOnce => Transition::Requeue(SpoolState::RetryFinal),
        SpoolState::RetryFinal | SpoolState::InFlight => Transition::Delete,
    }
}
