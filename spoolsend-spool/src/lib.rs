//! The filesystem spool consumed by the dispatcher
//!
//! The spool is a single flat directory used as a durable queue. Each message
//! is one file whose name encodes its delivery state:
//!
//! - `<id>.message` - pending, never attempted
//! - `<id>.message.sending` - claimed by a dispatcher (or stranded by a crash)
//! - `<id>.message.tryagain` - failed once
//! - `<id>.message.finalretry` - failed twice, one attempt left
//!
//! The only mutual-exclusion primitive is the atomic `rename(2)` performed by
//! [`claim`], which makes concurrent dispatchers in separate processes safe
//! without any lock.

pub mod claim;
pub mod config;
pub mod error;
pub mod message;
pub mod reverse_path;
pub mod scan;
pub mod types;

pub use claim::{ClaimedEntry, claim};
pub use config::SpoolConfig;
pub use error::{DecodeError, Result, SpoolError, ValidationError};
pub use message::SpooledMessage;
pub use reverse_path::reverse_path;
pub use scan::{ScanStats, SpoolScanner};
pub use types::{SpoolEntry, SpoolName, SpoolState};
