//! Key namespaces shared with the producing MTA.
//!
//! The store holds several record families under one keyspace; siphon
//! reads three of them. Index entries live under [`SEQ_PREFIX`] and are
//! lexically ordered; a full scan is bounded above by [`SEQ_UPPER`], since
//! `~` sorts after every character a sequence identifier can contain.

/// Prefix of the index-entry namespace.
pub const SEQ_PREFIX: &str = "seq ";

/// Exclusive upper bound for a full index scan.
pub const SEQ_UPPER: &str = "seq ~";

/// Derived key addressing an item's auxiliary metadata record and its
/// body stream.
#[must_use]
pub fn message_key(id: &str) -> String {
    format!("message {id}")
}
