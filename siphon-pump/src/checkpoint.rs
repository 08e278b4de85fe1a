//! Durable watermark of drain progress, kept outside the queue store.

use std::path::{Path, PathBuf};

use siphon_store::keys;
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;

use crate::error::CheckpointError;

/// The checkpoint file holds exactly one index key: the last key for which
/// a delivery attempt was initiated. It is read once at startup and
/// overwritten before every attempt, so after a crash the recorded cursor
/// is always at or past the last key that might have been sent.
/// Duplicates on restart are accepted, silent loss is not.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    path: PathBuf,
}

impl Checkpoint {
    /// Remembers the file location. No I/O happens here.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted cursor. An absent, unreadable, or empty file
    /// means the drain starts at the beginning of the index namespace.
    pub async fn load(&self) -> String {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let cursor = contents.trim();
                if cursor.is_empty() {
                    keys::SEQ_PREFIX.to_owned()
                } else {
                    cursor.to_owned()
                }
            }
            Err(err) => {
                debug!(
                    path = %self.path.display(),
                    error = %err,
                    "no usable checkpoint, starting from the beginning"
                );
                keys::SEQ_PREFIX.to_owned()
            }
        }
    }

    /// Overwrites the cursor and syncs it to disk before returning.
    ///
    /// Called before the corresponding delivery attempt.
    ///
    /// # Errors
    ///
    /// Any failure here is fatal for the run: draining without a durable
    /// watermark risks unbounded duplicate sends.
    pub async fn save(&self, cursor: &str) -> Result<(), CheckpointError> {
        self.write(cursor).await.map_err(|source| CheckpointError {
            path: self.path.clone(),
            source,
        })
    }

    async fn write(&self, cursor: &str) -> std::io::Result<()> {
        let mut file = fs::File::create(&self.path).await?;
        file.write_all(cursor.as_bytes()).await?;
        file.sync_all().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use siphon_store::keys;

    use super::Checkpoint;

    #[tokio::test]
    async fn absent_file_means_start_of_namespace() {
        let dir = tempfile::tempdir().expect("tempdir");
        let checkpoint = Checkpoint::open(dir.path().join("cursor.txt"));

        assert_eq!(checkpoint.load().await, keys::SEQ_PREFIX);
    }

    #[tokio::test]
    async fn empty_file_means_start_of_namespace() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cursor.txt");
        tokio::fs::write(&path, "  \n").await.expect("write");

        let checkpoint = Checkpoint::open(path);
        assert_eq!(checkpoint.load().await, keys::SEQ_PREFIX);
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let checkpoint = Checkpoint::open(dir.path().join("cursor.txt"));

        checkpoint.save("seq 00042").await.expect("save");
        assert_eq!(checkpoint.load().await, "seq 00042");
    }

    #[tokio::test]
    async fn save_overwrites_rather_than_appends() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cursor.txt");
        let checkpoint = Checkpoint::open(&path);

        checkpoint.save("seq 00001").await.expect("save");
        checkpoint.save("seq 00002").await.expect("save");

        let raw = tokio::fs::read_to_string(&path).await.expect("read");
        assert_eq!(raw, "seq 00002");
    }

    #[tokio::test]
    async fn load_trims_surrounding_whitespace() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cursor.txt");
        tokio::fs::write(&path, "seq 00007\n").await.expect("write");

        let checkpoint = Checkpoint::open(path);
        assert_eq!(checkpoint.load().await, "seq 00007");
    }

    #[tokio::test]
    async fn save_to_an_impossible_path_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let checkpoint = Checkpoint::open(dir.path().join("missing").join("cursor.txt"));

        assert!(checkpoint.save("seq 00001").await.is_err());
    }
}
