//! The contract an ordered store engine must satisfy.

use std::{fmt::Debug, pin::Pin};

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use tokio::io::AsyncRead;

use crate::error::Result;

/// A lazily readable message body, consumed at most once per delivery
/// attempt and never buffered whole.
pub type BodyStream = Pin<Box<dyn AsyncRead + Send>>;

/// Read-side contract of the shared ordered queue store.
///
/// Implementations wrap whatever engine actually holds the queue. The
/// engine is opened elsewhere (by path, with create-if-missing semantics);
/// this trait only exposes what the drain needs.
#[async_trait]
pub trait QueueStore: Debug + Send + Sync {
    /// One-shot, forward-only ascending scan of index keys strictly
    /// between the two bounds, keys only. An `Err` item is fatal for the
    /// whole run and the stream must not be polled again after one.
    fn scan(
        &self,
        lower_exclusive: &str,
        upper_exclusive: &str,
    ) -> BoxStream<'static, Result<String>>;

    /// Point lookup. `Ok(None)` means the key is absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Opens the body stream stored under a derived identifier key.
    /// `Ok(None)` means no stream exists for that key.
    async fn body(&self, key: &str) -> Result<Option<BodyStream>>;

    /// Releases the underlying store handle. Best-effort during fatal
    /// aborts.
    async fn close(&self) -> Result<()>;
}
