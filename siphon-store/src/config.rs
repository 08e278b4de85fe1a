use std::sync::Arc;

use serde::Deserialize;

use crate::{backends::MemoryQueueStore, r#trait::QueueStore};

/// Runtime selection of the queue-store backend.
///
/// The production ordered-store engine is an external collaborator that
/// plugs in behind [`QueueStore`]; the memory backend covers tests and
/// development runs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Memory-backed store (testing/development)
    #[default]
    Memory,
}

impl StoreConfig {
    /// Human-readable queue location for the startup banner.
    #[must_use]
    pub const fn location(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
        }
    }

    /// Convert the configuration into a concrete store handle.
    #[must_use]
    pub fn into_store(self) -> Arc<dyn QueueStore> {
        match self {
            Self::Memory => Arc::new(MemoryQueueStore::new()),
        }
    }
}
