//! Owned, order-preserving RFC 5322 header block.
//!
//! Queued items carry their header section as an opaque serialized block.
//! Redelivery needs to parse that block, append one marker header, and
//! render it back without disturbing what the producing system wrote, so
//! values are kept as raw bytes with their original folding intact.

use thiserror::Error;

/// Errors raised while parsing a stored header block.
#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("malformed header block: {0}")]
    Parse(#[from] mailparse::MailParseError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderEntry {
    name: String,
    value: Vec<u8>,
}

/// A parsed header block that can be extended and re-rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    entries: Vec<HeaderEntry>,
}

impl HeaderBlock {
    /// Parses a serialized header block. Both CRLF and bare LF line
    /// endings are accepted; an empty input yields an empty block.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::Parse`] when the block is not a valid
    /// header section.
    pub fn parse(raw: &[u8]) -> Result<Self, HeaderError> {
        let (parsed, _) = mailparse::parse_headers(raw)?;

        let entries = parsed
            .iter()
            .map(|header| HeaderEntry {
                name: header.get_key(),
                value: header.get_value_raw().to_vec(),
            })
            .collect();

        Ok(Self { entries })
    }

    /// Appends a header after everything already present.
    pub fn append(&mut self, name: &str, value: &str) {
        self.entries.push(HeaderEntry {
            name: name.to_owned(),
            value: value.as_bytes().to_vec(),
        });
    }

    /// First value stored under `name`, compared case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
            .map(|entry| entry.value.as_slice())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the block back to wire form, terminated by the blank line
    /// that separates headers from the body.
    #[must_use]
    pub fn render(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in &self.entries {
            out.extend_from_slice(entry.name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(&entry.value);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out
    }
}
