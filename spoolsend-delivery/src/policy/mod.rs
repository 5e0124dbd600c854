//! Policy decisions for delivery operations, kept free of I/O

pub mod retry;

pub use retry::{Transition, transition};
