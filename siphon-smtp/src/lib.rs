//! Outbound SMTP client: plain or TLS connections, session handshake,
//! envelope commands, and streamed message data.

pub mod client;
pub mod config;
pub mod error;
pub mod response;

pub use client::SmtpClient;
pub use config::{Credentials, SmtpConfig};
pub use error::{ClientError, Result};
pub use response::Response;
