//! Top-level configuration, loaded from a TOML file and treated as
//! opaque, already-validated input by the engine.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use siphon_smtp::SmtpConfig;
use siphon_store::StoreConfig;
use thiserror::Error;

fn default_checkpoint() -> PathBuf {
    PathBuf::from("./.lastsync.txt")
}

/// Everything a drain run needs to know.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Queue store backend.
    #[serde(default)]
    pub store: StoreConfig,

    /// Location of the cursor checkpoint file.
    #[serde(default = "default_checkpoint")]
    pub checkpoint: PathBuf,

    /// Delivery target.
    pub smtp: SmtpConfig,
}

/// Errors loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Config {
    /// Loads and parses the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::Config;

    #[test]
    fn parses_a_full_configuration() {
        let config: Config = toml::from_str(
            r#"
            checkpoint = "/var/lib/siphon/cursor.txt"

            [store]
            type = "memory"

            [smtp]
            host = "smtp.example.com"
            port = 465
            secure = true
            helo_name = "rescue.example.com"

            [smtp.auth]
            user = "queue"
            pass = "hunter2"
            "#,
        )
        .expect("parse");

        assert_eq!(config.checkpoint, PathBuf::from("/var/lib/siphon/cursor.txt"));
        assert_eq!(config.store.location(), "memory");
        assert_eq!(config.smtp.address(), "smtp.example.com:465");
        assert!(config.smtp.secure);
        assert_eq!(
            config.smtp.auth.as_ref().map(|auth| auth.user.as_str()),
            Some("queue")
        );
    }

    #[test]
    fn store_and_checkpoint_default() {
        let config: Config = toml::from_str(
            r#"
            [smtp]
            host = "localhost"
            "#,
        )
        .expect("parse");

        assert_eq!(config.store.location(), "memory");
        assert_eq!(config.checkpoint, PathBuf::from("./.lastsync.txt"));
        assert_eq!(config.smtp.address(), "localhost:25");
    }
}
