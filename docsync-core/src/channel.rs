//! The adapter/channel abstraction (§4.1).
//!
//! A channel is the bidirectional pipe between this engine and one remote
//! endpoint. The adapter owns connection lifecycle; the engine owns
//! protocol. Adapters are transport-agnostic: HTTP long-poll, WebSocket,
//! SSE, WebRTC, IndexedDB, Postgres, or (the only one shipped here) an
//! in-process loopback used by tests and demos.

use crate::error::SyncResult;
use crate::model::ChannelKind;
use crate::protocol::ProtocolMsg;
use docsync_types::{ChannelId, Identity};

/// Outbound message addressed to one or more channels.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub to_channel_ids: Vec<ChannelId>,
    pub message: ProtocolMsg,
}

impl Envelope {
    #[must_use]
    pub fn to(channel_id: ChannelId, message: ProtocolMsg) -> Self {
        Self {
            to_channel_ids: vec![channel_id],
            message,
        }
    }
}

/// Events an adapter raises into the core. The effect runtime wraps each
/// into a dispatcher `Msg` as it arrives.
#[derive(Debug, Clone)]
pub enum AdapterEvent {
    /// A connection appeared; the core mints a `ChannelId` for it.
    ChannelAdded { kind: ChannelKind },
    /// The transport-level handshake (or first protocol message) yielded a
    /// remote identity.
    ChannelEstablish {
        channel_id: ChannelId,
        remote_identity: Identity,
    },
    /// An inbound message (already unwrapped from any outer `batch`).
    ChannelReceive {
        channel_id: ChannelId,
        message: ProtocolMsg,
    },
    /// The connection is gone.
    ChannelRemoved { channel_id: ChannelId },
}

/// The capability set every transport implements.
///
/// Failure semantics (§4.1): transient send failures are retried
/// transport-side with bounded backoff until success or `ChannelRemoved`;
/// the core never retries at the protocol level.
pub trait Adapter: Send + Sync {
    /// Stable identifier for this adapter instance, used to key the
    /// `channel-added` event and to exclude a channel's own adapter from
    /// certain fan-out decisions.
    fn id(&self) -> &str;

    /// Best-effort delivery. A synchronous error here means the send
    /// definitely failed; in that case the caller should also expect a
    /// follow-up `ChannelRemoved` for persistent failures.
    fn send(&self, envelope: Envelope) -> SyncResult<()>;

    /// Releases resources and ceases delivery.
    fn stop(&mut self);
}
