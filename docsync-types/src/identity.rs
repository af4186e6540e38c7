//! The identity a peer presents during the channel handshake.

use crate::PeerId;
use serde::{Deserialize, Serialize};

/// What kind of actor a peer is, as declared during handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    /// A human-operated peer.
    User,
    /// An unattended or automated peer (a relay, a bot, a backup node).
    Service,
}

/// The identity a peer presents to other peers over a channel.
///
/// Exchanged during the `establish-request`/`establish-response` handshake;
/// storage adapters skip the handshake and are given a synthetic identity
/// instead (see `Identity::local_storage`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Stable identifier for the peer.
    pub peer_id: PeerId,
    /// Human-readable display name, not used for any routing decision.
    pub name: String,
    /// Declared kind, available to permission predicates.
    pub kind: IdentityKind,
}

impl Identity {
    /// Builds an identity for a user-operated peer.
    #[must_use]
    pub fn user(peer_id: impl Into<PeerId>, name: impl Into<String>) -> Self {
        Self {
            peer_id: peer_id.into(),
            name: name.into(),
            kind: IdentityKind::User,
        }
    }

    /// Builds an identity for a service peer.
    #[must_use]
    pub fn service(peer_id: impl Into<PeerId>, name: impl Into<String>) -> Self {
        Self {
            peer_id: peer_id.into(),
            name: name.into(),
            kind: IdentityKind::Service,
        }
    }

    /// Synthetic identity assigned to a storage channel, which never
    /// performs a real handshake.
    #[must_use]
    pub fn local_storage(peer_id: impl Into<PeerId>) -> Self {
        Self {
            peer_id: peer_id.into(),
            name: "local-storage".to_string(),
            kind: IdentityKind::Service,
        }
    }
}
