//! Dispatch of claimed spool entries to a remote delivery API
//!
//! This crate provides:
//! - The [`Transport`] seam and an SES implementation signed with SigV4
//! - A bounded-concurrency pool that drains a lazy source of claimed entries
//! - The three-stage retry escalation applied to each outcome

pub mod error;
pub mod policy;
pub mod processor;
pub mod transport;
mod types;

pub use error::{ConfigError, DeliveryError, TransportError};
pub use policy::{Transition, transition};
pub use processor::DeliveryProcessor;
pub use transport::{
    Receipt, Transport,
    ses::{Credentials, SesConfig, SesTransport},
};
pub use types::{BatchReport, Outcome};
