//! Typed error handling for the drain.
//!
//! The taxonomy matters more than the types themselves: item-scoped
//! faults and destination refusals never propagate past a single queued
//! item, while store, checkpoint, and transport failures abort the whole
//! run.

use std::{io, path::PathBuf};

use siphon_common::HeaderError;
use siphon_smtp::ClientError;
use siphon_store::StoreError;
use thiserror::Error;

/// Failure to durably persist the drain cursor.
#[derive(Debug, Error)]
#[error("cannot persist cursor to {}: {source}", path.display())]
pub struct CheckpointError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Faults scoped to a single queued item. Logged and skipped; the drain
/// continues with the next index key.
#[derive(Debug, Error)]
pub enum ItemError {
    /// The index entry's value vanished between the scan and the lookup.
    #[error("index entry points nowhere")]
    MissingEntry,

    /// The reference key is not valid UTF-8.
    #[error("reference key is not valid UTF-8")]
    BadReference,

    /// No queued item is stored under the reference key.
    #[error("no queued item stored under reference key")]
    MissingRecord,

    /// The stored value does not deserialize as an item record.
    #[error("queued item is not a well-formed record: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The stored header block does not parse.
    #[error("queued item headers are malformed: {0}")]
    Headers(#[from] HeaderError),

    /// A required envelope field is still absent after the metadata merge.
    #[error("queued item is missing its {0} after metadata merge")]
    Incomplete(&'static str),

    /// No body stream is stored for the message.
    #[error("no body stream stored for message")]
    MissingBody,

    /// A point lookup failed.
    #[error("store lookup failed: {0}")]
    Store(#[from] StoreError),
}

/// Outcome classification for one delivery attempt.
#[derive(Debug, Error)]
pub enum SendError {
    /// The destination refused this specific message. The channel remains
    /// usable and the drain continues.
    #[error("destination refused message: {code} {reply}")]
    Rejected { code: u16, reply: String },

    /// The connection itself failed. Fatal for the whole run; the channel
    /// will not reconnect.
    #[error(transparent)]
    Transport(#[from] ClientError),
}

/// Conditions that abort the whole drain.
#[derive(Debug, Error)]
pub enum PumpError {
    /// The index enumeration failed.
    #[error("store enumeration failed: {0}")]
    Store(#[from] StoreError),

    /// The cursor could not be persisted before an attempt.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// The transport connection failed.
    #[error("transport failure: {0}")]
    Transport(#[from] ClientError),
}
