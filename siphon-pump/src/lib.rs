//! siphon drains a persisted, ordered message queue and redelivers each
//! entry over a single reused SMTP connection, checkpointing progress so
//! an interrupted drain resumes where it left off.
//!
//! The engine is split along its seams: [`checkpoint`] persists the drain
//! cursor, [`reconstruct`] rebuilds a deliverable message from the
//! two-tier store layout, [`channel`] owns the one outbound connection,
//! and [`pump`] orchestrates the end-to-end drain.

pub mod channel;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod pump;
pub mod reconstruct;
pub mod record;

pub use channel::{Delivery, DeliveryChannel};
pub use checkpoint::Checkpoint;
pub use config::{Config, ConfigError};
pub use error::{CheckpointError, ItemError, PumpError, SendError};
pub use pump::{DrainSummary, Pump};
pub use reconstruct::{OutboundMessage, Reconstructor};
pub use record::{ItemMetadata, ItemRecord};
