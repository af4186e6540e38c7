//! Core type definitions shared across the synchronizer crates.
//!
//! This crate defines the fundamental, protocol-agnostic types used
//! throughout the engine:
//! - Peer, document, and channel identifiers
//! - Peer identity exchanged at handshake time
//! - Hybrid Logical Clock timestamps
//!
//! Document content and CRDT containers live in `docsync-doc`; wire
//! messages and the dispatcher live in `docsync-core`.

mod identity;
mod ids;
mod timestamp;

pub use identity::{Identity, IdentityKind};
pub use ids::{ChannelId, ChannelIdAllocator, DocId, PeerId};
pub use timestamp::HybridTimestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
