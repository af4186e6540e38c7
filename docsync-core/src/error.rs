//! Error types for the synchronizer core.

use docsync_types::ChannelId;
use thiserror::Error;

/// Result type for synchronizer operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced at the layers that have a caller able to act on a
/// `Result`: wire decode at the adapter boundary, façade calls, and
/// `DocumentEngine` construction. The dispatcher itself never returns one
/// of these — per the propagation policy it converts every internal error
/// into a `tracing::warn!` and an unchanged or minimally-adjusted model.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A message violated the protocol for the channel's current state
    /// (e.g. a sync message on a `Pending` channel).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// `visibility`/`mutability` refused the operation.
    #[error("permission denied: {reason}")]
    PermissionDenied { reason: String },

    /// A `waitForSync` deadline elapsed.
    #[error("operation timed out")]
    Timeout,

    /// The channel was removed mid-operation.
    #[error("channel closed")]
    ChannelClosed,

    /// Referenced a channel id the model has no record of.
    #[error("unknown channel: {0}")]
    UnknownChannel(ChannelId),

    /// An adapter reported a send/receive failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Wire encode/decode failure.
    #[error("wire error: {0}")]
    Wire(#[from] crate::wire::WireError),
}
