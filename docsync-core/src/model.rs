//! The synchronizer's state model.
//!
//! The model is a plain mutable struct owned by the dispatcher (single-
//! threaded, so no interior locking is needed). Every dispatch turn takes
//! `&mut SynchronizerModel` and returns the commands the effect runtime
//! should execute; no external code observes the model directly.

use crate::ephemeral::TimerlessStore;
use docsync_doc::{Document, VersionVector};
use docsync_types::{ChannelId, ChannelIdAllocator, DocId, HybridTimestamp, Identity, PeerId};
use std::collections::{HashMap, HashSet};

/// Which collaborator raised a channel: a network transport or a storage
/// backend treated as a synthetic, always-established peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Network,
    Storage,
}

/// A bidirectional pipe between this engine and one remote endpoint.
#[derive(Debug, Clone)]
pub enum Channel {
    /// Added by an adapter but not yet handshaken.
    Pending {
        channel_id: ChannelId,
        adapter_id: String,
        kind: ChannelKind,
    },
    /// Handshake complete; both ends have exchanged identity.
    Established {
        channel_id: ChannelId,
        adapter_id: String,
        kind: ChannelKind,
        peer_id: PeerId,
        remote_identity: Identity,
    },
}

impl Channel {
    #[must_use]
    pub fn channel_id(&self) -> ChannelId {
        match self {
            Channel::Pending { channel_id, .. } | Channel::Established { channel_id, .. } => {
                *channel_id
            }
        }
    }

    #[must_use]
    pub fn kind(&self) -> ChannelKind {
        match self {
            Channel::Pending { kind, .. } | Channel::Established { kind, .. } => *kind,
        }
    }

    #[must_use]
    pub fn adapter_id(&self) -> &str {
        match self {
            Channel::Pending { adapter_id, .. } | Channel::Established { adapter_id, .. } => {
                adapter_id
            }
        }
    }

    #[must_use]
    pub fn peer_id(&self) -> Option<&PeerId> {
        match self {
            Channel::Pending { .. } => None,
            Channel::Established { peer_id, .. } => Some(peer_id),
        }
    }

    #[must_use]
    pub fn is_established(&self) -> bool {
        matches!(self, Channel::Established { .. })
    }
}

/// Our model of a peer's knowledge of one document.
///
/// `lastKnownVersion` only exists when `status = Synced`; this is encoded
/// by putting the version vector directly on the `Synced` variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Awareness {
    /// The peer has never spoken about this doc.
    Unknown,
    /// We've sent `new-doc`/`sync-request` but no reply yet.
    Pending,
    /// The peer explicitly reported they don't have it.
    Absent,
    /// Our model of their state as of the last observed version.
    Synced { last_known_version: VersionVector },
}

impl Default for Awareness {
    fn default() -> Self {
        Awareness::Unknown
    }
}

impl Awareness {
    #[must_use]
    pub fn last_known_version(&self) -> Option<&VersionVector> {
        match self {
            Awareness::Synced { last_known_version } => Some(last_known_version),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_subscribed_candidate(&self) -> bool {
        !matches!(self, Awareness::Absent)
    }
}

/// Per-peer state, kept alive for the lifetime of the process even across
/// disconnects so that reconnection can use the cached document awareness.
#[derive(Debug, Clone)]
pub struct PeerState {
    pub identity: Identity,
    pub channels: HashSet<ChannelId>,
    pub subscriptions: HashSet<DocId>,
    pub document_awareness: HashMap<DocId, Awareness>,
    pub last_seen: HybridTimestamp,
}

impl PeerState {
    #[must_use]
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            channels: HashSet::new(),
            subscriptions: HashSet::new(),
            document_awareness: HashMap::new(),
            last_seen: HybridTimestamp::now(),
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.channels.is_empty()
    }

    #[must_use]
    pub fn awareness(&self, doc_id: &DocId) -> &Awareness {
        self.document_awareness.get(doc_id).unwrap_or(&Awareness::Unknown)
    }

    pub fn set_awareness(&mut self, doc_id: DocId, awareness: Awareness) {
        self.document_awareness.insert(doc_id, awareness);
    }
}

/// A locally held CRDT document plus the bookkeeping the dispatcher needs
/// around it.
pub struct DocState {
    pub doc_id: DocId,
    pub doc: Document,
    /// Whether this doc's container supports delta export, affecting
    /// whether first-contact sync exchanges snapshots or updates. Every
    /// reference `Document` is mergeable; this stays `true` for them and
    /// exists so an embedder swapping in a non-CRDT-backed doc can flag
    /// snapshot-only semantics.
    pub mergeable: bool,
}

impl DocState {
    #[must_use]
    pub fn new(doc_id: DocId, doc: Document) -> Self {
        Self {
            doc_id,
            doc,
            mergeable: true,
        }
    }
}

/// Externally observable readiness of one document on one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyStatus {
    Loading,
    Found,
    NotFound,
    Synced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyState {
    pub channel_id: ChannelId,
    pub kind: ChannelKind,
    pub peer_id: Option<PeerId>,
    pub status: ReadyStatus,
}

/// The complete synchronizer state: channels, peers, documents, and the
/// registry of pending requests the façade layer is waiting on.
pub struct SynchronizerModel {
    pub identity: Identity,
    pub channel_ids: ChannelIdAllocator,
    pub channels: HashMap<ChannelId, Channel>,
    pub peers: HashMap<PeerId, PeerState>,
    pub documents: HashMap<DocId, DocState>,
    /// Last ready-state set emitted per document, used to detect changes
    /// before re-emitting `ready-state-changed`.
    pub last_ready_states: HashMap<DocId, Vec<ReadyState>>,
    /// This peer's own ephemeral contribution per document (presence,
    /// cursor, ...), refreshed by heartbeats and broadcast in full to a
    /// peer on its initial sync-response (§4.5, §4.8).
    pub local_ephemeral: HashMap<DocId, TimerlessStore>,
    /// Max number of docs fanned out in one `directory-response`/
    /// `sync-request` batch before splitting across multiple messages.
    pub max_fanout_size: usize,
}

impl SynchronizerModel {
    #[must_use]
    pub fn new(identity: Identity) -> Self {
        Self::with_max_fanout_size(identity, crate::config::SynchronizerConfig::default().max_fanout_size)
    }

    #[must_use]
    pub fn with_max_fanout_size(identity: Identity, max_fanout_size: usize) -> Self {
        Self {
            identity,
            channel_ids: ChannelIdAllocator::new(),
            channels: HashMap::new(),
            peers: HashMap::new(),
            documents: HashMap::new(),
            last_ready_states: HashMap::new(),
            local_ephemeral: HashMap::new(),
            max_fanout_size,
        }
    }

    pub fn peer_state_mut(&mut self, identity: &Identity) -> &mut PeerState {
        self.peers
            .entry(identity.peer_id.clone())
            .or_insert_with(|| PeerState::new(identity.clone()))
    }

    #[must_use]
    pub fn established_channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values().filter(|c| c.is_established())
    }

    #[must_use]
    pub fn channels_for_peer<'a>(&'a self, peer_id: &'a PeerId) -> impl Iterator<Item = ChannelId> + 'a {
        self.established_channels()
            .filter(move |c| c.peer_id() == Some(peer_id))
            .map(Channel::channel_id)
    }

    /// Computes the per-channel ready state for one document (§4.9).
    #[must_use]
    pub fn ready_states_for(&self, doc_id: &DocId) -> Vec<ReadyState> {
        let present = self.documents.contains_key(doc_id);
        self.channels
            .values()
            .map(|channel| {
                let peer_id = channel.peer_id().cloned();
                let status = match (channel.is_established(), &peer_id) {
                    (false, _) => ReadyStatus::Loading,
                    (true, None) => ReadyStatus::Loading,
                    (true, Some(pid)) => {
                        let awareness = self
                            .peers
                            .get(pid)
                            .map(|p| p.awareness(doc_id))
                            .unwrap_or(&Awareness::Unknown);
                        match awareness {
                            Awareness::Synced { .. } if present => ReadyStatus::Synced,
                            Awareness::Absent => ReadyStatus::NotFound,
                            _ if present => ReadyStatus::Found,
                            _ => ReadyStatus::Loading,
                        }
                    }
                };
                ReadyState {
                    channel_id: channel.channel_id(),
                    kind: channel.kind(),
                    peer_id,
                    status,
                }
            })
            .collect()
    }
}
