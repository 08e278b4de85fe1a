//! SMTP reply parsing and classification.

use crate::error::{ClientError, Result};

/// A complete, possibly multi-line SMTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The reply code common to every line.
    pub code: u16,
    /// Text of each line, code and separator stripped.
    pub lines: Vec<String>,
}

impl Response {
    #[must_use]
    pub const fn new(code: u16, lines: Vec<String>) -> Self {
        Self { code, lines }
    }

    /// Reply text flattened to one line, for logs and reports.
    #[must_use]
    pub fn message(&self) -> String {
        self.lines.join("; ")
    }

    /// `true` for 2xx replies.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, 200..=299)
    }

    /// `true` for 3xx replies (e.g. 354 after DATA).
    #[must_use]
    pub const fn is_intermediate(&self) -> bool {
        matches!(self.code, 300..=399)
    }

    /// `true` for 4xx replies.
    #[must_use]
    pub const fn is_temporary_error(&self) -> bool {
        matches!(self.code, 400..=499)
    }

    /// `true` for 5xx replies.
    #[must_use]
    pub const fn is_permanent_error(&self) -> bool {
        matches!(self.code, 500..=599)
    }

    /// Whether an EHLO reply advertises the given capability keyword.
    #[must_use]
    pub fn advertises(&self, keyword: &str) -> bool {
        self.lines.iter().any(|line| {
            line.split_whitespace()
                .next()
                .is_some_and(|word| word.eq_ignore_ascii_case(keyword))
        })
    }

    /// Attempts to parse one complete reply from the front of `buffer`.
    ///
    /// Returns the reply and the number of bytes consumed, or `None` when
    /// more data is needed. Accepts both CRLF and bare LF line endings.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Protocol`] for anything that is not a valid
    /// SMTP reply.
    pub fn parse(buffer: &[u8]) -> Result<Option<(Self, usize)>> {
        let mut consumed = 0;
        let mut lines = Vec::new();
        let mut code: Option<u16> = None;

        loop {
            let rest = &buffer[consumed..];
            let Some(newline) = rest.iter().position(|&byte| byte == b'\n') else {
                return Ok(None);
            };

            let mut raw_line = &rest[..newline];
            if raw_line.ends_with(b"\r") {
                raw_line = &raw_line[..raw_line.len() - 1];
            }
            consumed += newline + 1;

            let line = std::str::from_utf8(raw_line)
                .map_err(|e| ClientError::Protocol(format!("reply is not UTF-8: {e}")))?;

            let line_code = line
                .get(..3)
                .and_then(|digits| digits.parse::<u16>().ok())
                .ok_or_else(|| ClientError::Protocol(format!("invalid reply line {line:?}")))?;

            match code {
                None => code = Some(line_code),
                Some(first) if first != line_code => {
                    return Err(ClientError::Protocol(format!(
                        "reply code changed mid-reply: {first} then {line_code}"
                    )));
                }
                Some(_) => {}
            }

            let (is_last, text) = match line.as_bytes().get(3) {
                None => (true, ""),
                Some(b' ') => (true, line.get(4..).unwrap_or("")),
                Some(b'-') => (false, line.get(4..).unwrap_or("")),
                Some(_) => {
                    return Err(ClientError::Protocol(format!(
                        "invalid separator in reply line {line:?}"
                    )));
                }
            };

            lines.push(text.to_owned());

            if is_last {
                let code = code.ok_or_else(|| {
                    ClientError::Protocol("reply terminated without a code".to_owned())
                })?;
                return Ok(Some((Self::new(code, lines), consumed)));
            }
        }
    }
}
