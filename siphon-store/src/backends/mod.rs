//! Backend implementations for the queue-store boundary.
//!
//! Only the in-memory backend lives here; the production ordered-store
//! engine is an external collaborator that plugs in behind
//! [`QueueStore`](crate::QueueStore).

pub mod memory;

pub use memory::MemoryQueueStore;
