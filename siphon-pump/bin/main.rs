use std::path::PathBuf;

use siphon_pump::{Checkpoint, Config, DeliveryChannel, Pump};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    siphon_common::logging::init();

    let config_path = find_config_file()?;
    let config = Config::from_path(&config_path)?;

    info!("pump messages from queue store to SMTP");
    info!(queue = %config.store.location(), "queue location");
    info!(host = %config.smtp.host, port = config.smtp.port, "delivery target");
    info!(
        tls = config.smtp.secure,
        auth = config.smtp.auth.is_some(),
        checkpoint = %config.checkpoint.display(),
        "transport options"
    );

    let store = config.store.into_store();
    let checkpoint = Checkpoint::open(config.checkpoint);
    let channel = DeliveryChannel::new(config.smtp);

    let summary = Pump::new(store, checkpoint, channel).run().await?;

    info!(
        scanned = summary.scanned,
        delivered = summary.delivered,
        rejected = summary.rejected,
        skipped = summary.skipped,
        expired = summary.expired,
        "all messages processed"
    );

    Ok(())
}

/// Find the configuration file using the following precedence:
/// 1. `SIPHON_CONFIG` environment variable
/// 2. ./siphon.config.toml (current working directory)
/// 3. /etc/siphon/siphon.config.toml (system-wide config)
fn find_config_file() -> anyhow::Result<PathBuf> {
    if let Ok(env_path) = std::env::var("SIPHON_CONFIG") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        anyhow::bail!(
            "SIPHON_CONFIG points to non-existent file: {}",
            path.display()
        );
    }

    let default_paths = [
        PathBuf::from("./siphon.config.toml"),
        PathBuf::from("/etc/siphon/siphon.config.toml"),
    ];

    for path in &default_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    anyhow::bail!(
        "no configuration file found; set SIPHON_CONFIG or create ./siphon.config.toml"
    )
}
