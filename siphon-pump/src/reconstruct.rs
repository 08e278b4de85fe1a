//! Rebuilds a deliverable message from the two-tier store layout: a small
//! JSON item record plus separately stored metadata and body stream.

use std::{fmt, io::Cursor, sync::Arc};

use siphon_common::HeaderBlock;
use siphon_store::{BodyStream, QueueStore, keys};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{
    error::ItemError,
    record::{ItemMetadata, ItemRecord},
};

/// Name of the header appended to every message routed through this
/// rescue path, so downstream systems can tell redeliveries from
/// originals.
pub const RESCUE_HEADER_NAME: &str = "X-Sending-Zone";

/// Fixed value of the rescue marker header.
pub const RESCUE_HEADER_VALUE: &str = "rescue";

/// A reconstructed message ready for delivery. The body stays a stream;
/// the full message is never materialized in memory.
pub struct OutboundMessage {
    pub id: String,
    pub seq: Option<String>,
    pub from: String,
    pub to: String,
    headers: Vec<u8>,
    body: BodyStream,
}

impl OutboundMessage {
    /// Rendered header block, rescue marker included.
    #[must_use]
    pub fn headers(&self) -> &[u8] {
        &self.headers
    }

    /// The wire form of the message: rendered headers chained with the
    /// stored body stream.
    #[must_use]
    pub fn into_read(self) -> impl AsyncRead + Unpin + Send {
        Cursor::new(self.headers).chain(self.body)
    }
}

impl fmt::Debug for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundMessage")
            .field("id", &self.id)
            .field("seq", &self.seq)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("header_bytes", &self.headers.len())
            .finish_non_exhaustive()
    }
}

/// Builds [`OutboundMessage`]s from reference keys.
#[derive(Debug, Clone)]
pub struct Reconstructor {
    store: Arc<dyn QueueStore>,
}

impl Reconstructor {
    #[must_use]
    pub fn new(store: Arc<dyn QueueStore>) -> Self {
        Self { store }
    }

    /// Resolves a reference key into a deliverable message.
    ///
    /// `Ok(None)` means the content store no longer holds metadata for
    /// the item: a reported no-op rather than a failure, since entries
    /// legitimately expire out of the content store.
    ///
    /// # Errors
    ///
    /// Per-item faults only; the caller skips the item and carries on.
    pub async fn build(&self, ref_key: &str) -> Result<Option<OutboundMessage>, ItemError> {
        let raw = self
            .store
            .get(ref_key)
            .await?
            .ok_or(ItemError::MissingRecord)?;
        let mut item: ItemRecord = serde_json::from_slice(&raw)?;

        let derived = keys::message_key(&item.id);
        let Some(meta_raw) = self.store.get(&derived).await? else {
            return Ok(None);
        };
        let meta: ItemMetadata = serde_json::from_slice(&meta_raw)?;
        item.merge(meta);

        let mut headers =
            HeaderBlock::parse(item.headers.as_deref().unwrap_or_default().as_bytes())?;
        headers.append(RESCUE_HEADER_NAME, RESCUE_HEADER_VALUE);

        let from = item.from.ok_or(ItemError::Incomplete("sender"))?;
        let to = item.recipient.ok_or(ItemError::Incomplete("recipient"))?;

        let body = self
            .store
            .body(&derived)
            .await?
            .ok_or(ItemError::MissingBody)?;

        Ok(Some(OutboundMessage {
            id: item.id,
            seq: item.seq,
            from,
            to,
            headers: headers.render(),
            body,
        }))
    }
}
