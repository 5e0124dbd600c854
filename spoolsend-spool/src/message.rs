use std::sync::Arc;

use mailparse::{MailAddr, MailHeader, MailHeaderMap};
use spoolsend_common::internal;

use crate::error::DecodeError;

/// A decoded spool entry
///
/// The raw bytes are kept verbatim: they are what gets transmitted. Decoding
/// only extracts the header section and the envelope-sender candidates.
#[derive(Debug, Clone)]
pub struct SpooledMessage {
    data: Arc<[u8]>,
    return_path: Option<String>,
    sender: Vec<String>,
    from: Vec<String>,
}

/// RFC 5322 `field-name`: printable US-ASCII except `:`
fn is_field_name(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| (33..=126).contains(&b) && b != b':')
}

/// Flatten an address header into its mailbox addresses, groups included
fn addresses(headers: &[MailHeader<'_>], name: &str) -> Vec<String> {
    let Some(header) = headers.get_first_header(name) else {
        return Vec::new();
    };

    match mailparse::addrparse_header(header) {
        Ok(list) => list
            .iter()
            .flat_map(|addr| match addr {
                MailAddr::Single(info) => vec![info.addr.trim().to_string()],
                MailAddr::Group(group) => group
                    .addrs
                    .iter()
                    .map(|info| info.addr.trim().to_string())
                    .collect(),
            })
            .filter(|addr| !addr.is_empty())
            .collect(),
        Err(e) => {
            internal!(level = DEBUG, header = name, error = %e, "Ignoring unparsable address header");
            Vec::new()
        }
    }
}

/// `Return-Path: <bounce@example.com>`; the null path `<>` counts as absent
fn return_path(headers: &[MailHeader<'_>]) -> Option<String> {
    let value = headers.get_first_value("Return-Path")?;
    let path = value
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim();

    (!path.is_empty()).then(|| path.to_string())
}

impl SpooledMessage {
    /// Decode raw spool content
    ///
    /// # Errors
    /// - [`DecodeError::Empty`] for a zero-length entry
    /// - [`DecodeError::Malformed`] if the header section cannot be parsed
    /// - [`DecodeError::InvalidShape`] if there are no headers or a header
    ///   name is not a valid field name
    pub fn decode(data: impl Into<Arc<[u8]>>) -> Result<Self, DecodeError> {
        let data = data.into();

        if data.iter().all(u8::is_ascii_whitespace) {
            return Err(DecodeError::Empty);
        }

        let (parsed, _) = mailparse::parse_headers(&data)?;

        if parsed.is_empty() {
            return Err(DecodeError::InvalidShape("no headers".to_string()));
        }

        for header in &parsed {
            let key = header.get_key();
            let key = key.trim_end();
            if !is_field_name(key) {
                return Err(DecodeError::InvalidShape(format!(
                    "invalid header name {key:?}"
                )));
            }
        }

        let return_path = return_path(&parsed);
        let sender = addresses(&parsed, "Sender");
        let from = addresses(&parsed, "From");

        Ok(Self {
            data: Arc::clone(&data),
            return_path,
            sender,
            from,
        })
    }

    /// The exact bytes read from the spool
    #[must_use]
    pub const fn data(&self) -> &Arc<[u8]> {
        &self.data
    }

    /// The explicit envelope return path, if any
    #[must_use]
    pub fn return_path(&self) -> Option<&str> {
        self.return_path.as_deref()
    }

    /// Addresses from the `Sender` header
    #[must_use]
    pub fn sender(&self) -> &[String] {
        &self.sender
    }

    /// Addresses from the `From` header
    #[must_use]
    pub fn from(&self) -> &[String] {
        &self.from
    }
}
