//! Typed queue records and the metadata merge.

use serde::Deserialize;

/// A queued item as stored under its reference key.
///
/// Only `id` is guaranteed by the producing MTA; the envelope fields may
/// arrive in the record itself or later through [`ItemMetadata`]. Unknown
/// fields in the stored JSON are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemRecord {
    pub id: String,

    /// Zero-padded position within the message's send sequence.
    #[serde(default)]
    pub seq: Option<String>,

    #[serde(default)]
    pub from: Option<String>,

    #[serde(default)]
    pub recipient: Option<String>,

    /// Serialized header block, rendered by the producing MTA.
    #[serde(default)]
    pub headers: Option<String>,

    #[serde(default)]
    pub interface: Option<String>,

    #[serde(default)]
    pub origin: Option<String>,

    #[serde(default)]
    pub transtype: Option<String>,

    /// Original submission time, milliseconds since the epoch.
    #[serde(default)]
    pub time: Option<u64>,
}

/// Auxiliary metadata stored separately under the item's derived key,
/// holding submission attributes the item record may have dropped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemMetadata {
    #[serde(default)]
    pub seq: Option<String>,

    #[serde(default)]
    pub from: Option<String>,

    #[serde(default)]
    pub recipient: Option<String>,

    #[serde(default)]
    pub headers: Option<String>,

    #[serde(default)]
    pub interface: Option<String>,

    #[serde(default)]
    pub origin: Option<String>,

    #[serde(default)]
    pub transtype: Option<String>,

    #[serde(default)]
    pub time: Option<u64>,
}

impl ItemRecord {
    /// Folds metadata into the record. Precedence is fixed: a metadata
    /// field is taken only when the record's own field is empty; record
    /// fields are authoritative and never overwritten.
    pub fn merge(&mut self, meta: ItemMetadata) {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
            if slot.is_none() {
                *slot = value;
            }
        }

        fill(&mut self.seq, meta.seq);
        fill(&mut self.from, meta.from);
        fill(&mut self.recipient, meta.recipient);
        fill(&mut self.headers, meta.headers);
        fill(&mut self.interface, meta.interface);
        fill(&mut self.origin, meta.origin);
        fill(&mut self.transtype, meta.transtype);
        fill(&mut self.time, meta.time);
    }
}
