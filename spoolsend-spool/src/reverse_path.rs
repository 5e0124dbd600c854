//! Envelope-sender resolution
//!
//! A message without a reverse path is never claimed.

use crate::message::SpooledMessage;

/// Resolve the envelope sender of `message`
///
/// First match wins: an explicit `Return-Path`, then the first `Sender`
/// mailbox, then the first `From` mailbox.
#[must_use]
pub fn reverse_path(message: &SpooledMessage) -> Option<&str> {
    message
        .return_path()
        .filter(|path| !path.is_empty())
        .or_else(|| message.sender().first().map(String::as_str))
        .or_else(|| message.from().first().map(String::as_str))
}
