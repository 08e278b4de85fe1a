//! Shared primitives for the siphon workspace: tracing initialisation and
//! the owned header-block representation used when rebuilding messages.

pub mod headers;
pub mod logging;

pub use headers::{HeaderBlock, HeaderError};
