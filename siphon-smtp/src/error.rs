//! Transport-level faults raised by the SMTP client.

use std::io;

use thiserror::Error;

/// Errors that mean the connection itself can no longer be trusted.
///
/// Server replies are not errors at this layer: every command returns the
/// parsed [`Response`](crate::Response) whatever its code, and callers
/// classify replies themselves. The exception is the session handshake,
/// where a refusal leaves no usable session behind.
#[derive(Debug, Error)]
pub enum ClientError {
    /// IO error occurred during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The peer closed the connection.
    #[error("connection closed by peer")]
    Closed,

    /// The server sent something that is not a valid SMTP reply.
    #[error("malformed server reply: {0}")]
    Protocol(String),

    /// TLS setup or upgrade failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The server refused a handshake step (greeting, EHLO, AUTH).
    #[error("server refused {during}: {code} {message}")]
    HandshakeRefused {
        during: &'static str,
        code: u16,
        message: String,
    },
}

/// Specialized `Result` type for SMTP client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
