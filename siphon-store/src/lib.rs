//! The ordered queue-store boundary.
//!
//! The queue itself lives in an external ordered key-value engine; siphon
//! only requires ascending ranged iteration over index keys, point
//! lookups, and streamed reads of the separately stored message bodies.
//! Everything behind [`QueueStore`] is a pluggable backend.

pub mod backends;
pub mod config;
pub mod error;
pub mod keys;
pub mod r#trait;

pub use backends::MemoryQueueStore;
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use r#trait::{BodyStream, QueueStore};
