//! Connection settings for the delivery target.

use serde::Deserialize;

const fn default_port() -> u16 {
    25
}

fn default_helo_name() -> String {
    "localhost".to_owned()
}

/// Where and how to connect for outbound delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    /// Target host name or address.
    pub host: String,

    /// Target port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Wrap the connection in TLS immediately (implicit TLS). When unset,
    /// STARTTLS is still attempted opportunistically if the server
    /// advertises it.
    #[serde(default)]
    pub secure: bool,

    /// Accept invalid TLS certificates. Testing only.
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Name presented in EHLO/HELO.
    #[serde(default = "default_helo_name")]
    pub helo_name: String,

    /// Optional AUTH PLAIN credentials.
    #[serde(default)]
    pub auth: Option<Credentials>,
}

/// Credentials for AUTH PLAIN.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub pass: String,
}

impl SmtpConfig {
    /// `host:port` form used for the TCP connect.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
