//! The drain orchestrator: enumerate once, then checkpoint and deliver
//! each pending key strictly in ascending order.

use std::sync::Arc;

use futures_util::StreamExt;
use siphon_store::{QueueStore, keys};
use tracing::{error, info, warn};

use crate::{
    channel::DeliveryChannel,
    checkpoint::Checkpoint,
    error::{ItemError, PumpError, SendError},
    reconstruct::Reconstructor,
};

/// Per-run tallies; one bump per index key processed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DrainSummary {
    /// Index keys collected by the enumeration pass.
    pub scanned: usize,
    /// Messages the destination accepted.
    pub delivered: usize,
    /// Messages the destination refused.
    pub rejected: usize,
    /// Items skipped on per-item faults.
    pub skipped: usize,
    /// Items whose content the store had already expired (reported
    /// no-ops).
    pub expired: usize,
}

enum Outcome {
    Delivered,
    Rejected,
    Skipped,
    Expired,
}

/// One full drain of the queue.
///
/// The pump owns the store handle, the checkpoint file, and the delivery
/// channel for the lifetime of a run; nothing is shared with concurrent
/// runs. Processing is strictly sequential; the cursor is a single
/// watermark and out-of-order dispatch would make it meaningless.
pub struct Pump {
    store: Arc<dyn QueueStore>,
    checkpoint: Checkpoint,
    reconstructor: Reconstructor,
    channel: DeliveryChannel,
}

impl Pump {
    #[must_use]
    pub fn new(store: Arc<dyn QueueStore>, checkpoint: Checkpoint, channel: DeliveryChannel) -> Self {
        let reconstructor = Reconstructor::new(Arc::clone(&store));
        Self {
            store,
            checkpoint,
            reconstructor,
            channel,
        }
    }

    /// Runs the drain to completion.
    ///
    /// # Errors
    ///
    /// Store enumeration, checkpoint persistence, and transport failures
    /// abort the run after a best-effort resource release; every other
    /// fault is handled per item.
    pub async fn run(mut self) -> Result<DrainSummary, PumpError> {
        let cursor = self.checkpoint.load().await;
        if cursor == keys::SEQ_PREFIX {
            info!("enumerating queued messages from the start of the index");
        } else {
            info!(cursor = %cursor, "resuming enumeration after persisted cursor");
        }

        let pending = match self.enumerate(&cursor).await {
            Ok(pending) => pending,
            Err(err) => {
                error!(error = %err, "enumeration failed");
                self.release().await;
                return Err(err);
            }
        };

        info!(pending = pending.len(), "enumeration complete");

        let mut summary = DrainSummary {
            scanned: pending.len(),
            ..DrainSummary::default()
        };

        for seq_key in &pending {
            if let Err(err) = self.checkpoint.save(seq_key).await {
                error!(seq = %seq_key, error = %err, "cannot persist cursor, aborting drain");
                self.release().await;
                return Err(err.into());
            }

            match self.process(seq_key).await {
                Ok(Outcome::Delivered) => summary.delivered += 1,
                Ok(Outcome::Rejected) => summary.rejected += 1,
                Ok(Outcome::Skipped) => summary.skipped += 1,
                Ok(Outcome::Expired) => summary.expired += 1,
                Err(err) => {
                    error!(seq = %seq_key, error = %err, "fatal failure, aborting drain");
                    self.release().await;
                    return Err(err);
                }
            }
        }

        self.channel.close().await;
        if let Err(err) = self.store.close().await {
            warn!(error = %err, "store did not close cleanly");
        }

        info!(
            delivered = summary.delivered,
            rejected = summary.rejected,
            skipped = summary.skipped,
            expired = summary.expired,
            "drain complete"
        );

        Ok(summary)
    }

    /// Collects the full ordered key list for this run. The scan is
    /// bounded and exhausted before draining begins: this is a batch
    /// tool, not a continuous tailer.
    async fn enumerate(&self, cursor: &str) -> Result<Vec<String>, PumpError> {
        let mut scan = self.store.scan(cursor, keys::SEQ_UPPER);
        let mut pending = Vec::new();
        while let Some(entry) = scan.next().await {
            pending.push(entry?);
        }
        Ok(pending)
    }

    async fn process(&mut self, seq_key: &str) -> Result<Outcome, PumpError> {
        let ref_key = match self.store.get(seq_key).await {
            Ok(Some(raw)) => match String::from_utf8(raw) {
                Ok(ref_key) => ref_key,
                Err(_) => {
                    warn!(seq = %seq_key, error = %ItemError::BadReference, "skipping item");
                    return Ok(Outcome::Skipped);
                }
            },
            Ok(None) => {
                warn!(seq = %seq_key, error = %ItemError::MissingEntry, "skipping item");
                return Ok(Outcome::Skipped);
            }
            Err(err) => {
                warn!(seq = %seq_key, error = %ItemError::Store(err), "skipping item");
                return Ok(Outcome::Skipped);
            }
        };

        info!(seq = %seq_key, reference = %ref_key, "processing next message");

        let message = match self.reconstructor.build(&ref_key).await {
            Ok(Some(message)) => message,
            Ok(None) => {
                warn!(
                    seq = %seq_key,
                    reference = %ref_key,
                    "no metadata found for item, nothing to redeliver"
                );
                return Ok(Outcome::Expired);
            }
            Err(err) => {
                warn!(seq = %seq_key, reference = %ref_key, error = %err, "skipping undeliverable item");
                return Ok(Outcome::Skipped);
            }
        };

        let id = message.id.clone();
        let seq = message.seq.clone().unwrap_or_default();
        let from = message.from.clone();
        let to = message.to.clone();

        match self.channel.send(message).await {
            Ok(delivery) => {
                info!(
                    id = %id,
                    seq = %seq,
                    from = %from,
                    to = %to,
                    response = %delivery.response.message(),
                    "ACCEPTED"
                );
                Ok(Outcome::Delivered)
            }
            Err(SendError::Rejected { code, reply }) => {
                warn!(
                    id = %id,
                    seq = %seq,
                    from = %from,
                    to = %to,
                    code,
                    response = %reply,
                    "REJECTED"
                );
                Ok(Outcome::Rejected)
            }
            Err(SendError::Transport(err)) => Err(PumpError::Transport(err)),
        }
    }

    /// Best-effort resource release on the fatal-abort path.
    async fn release(&mut self) {
        self.channel.close().await;
        if let Err(err) = self.store.close().await {
            warn!(error = %err, "store did not close cleanly");
        }
    }
}
