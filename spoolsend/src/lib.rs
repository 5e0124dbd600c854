//! Batch dispatcher draining a filesystem spool into Amazon SES
//!
//! [`controller::Dispatcher`] is the root configuration and the entry point
//! for one batch; [`guard`] keeps overlapping batches apart.

pub mod controller;
pub mod guard;

pub use controller::Dispatcher;
pub use guard::{GuardConfig, LockFileGuard, NoopGuard, RunGuard};
