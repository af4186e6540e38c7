//! Synchronizer protocol messages.
//!
//! Every message carries an implicit `type` tag via the `ProtocolMsg` enum
//! variant name; `wire` maps each variant to the one-byte discriminants
//! this module documents alongside each struct.

use docsync_doc::VersionVector;
use docsync_types::{DocId, Identity};
use serde::{Deserialize, Serialize};

/// One wire message. Establishment messages are valid on any channel state;
/// discovery, sync and ephemeral messages are only valid once a channel is
/// `Established` (the dispatcher drops them otherwise, see §7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProtocolMsg {
    /// 0x10
    EstablishRequest(EstablishRequest),
    /// 0x11
    EstablishResponse(EstablishResponse),
    /// 0x1F — dispatch each inner message as if received individually; the
    /// dispatcher's output commands are concatenated.
    Batch(BatchMsg),

    /// 0x20
    DirectoryRequest,
    /// 0x21
    DirectoryResponse(DirectoryResponse),
    /// 0x22 — announce, don't send.
    NewDoc(NewDoc),

    /// 0x30
    SyncRequest(SyncRequest),
    /// 0x31
    SyncResponse(SyncResponse),
    /// 0x32 — spontaneous post-sync update; same transmission as
    /// `SyncResponse`, no ephemeral side effects.
    Update(UpdateMsg),
    /// 0x38
    DeleteRequest(DeleteRequest),
    /// 0x39
    DeleteResponse(DeleteResponse),

    /// 0x40
    Ephemeral(EphemeralMsg),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstablishRequest {
    pub identity: Identity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstablishResponse {
    pub identity: Identity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchMsg {
    pub messages: Vec<ProtocolMsg>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryResponse {
    pub doc_ids: Vec<DocId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDoc {
    pub doc_ids: Vec<DocId>,
}

/// One document entry in a `sync-request`: version is omitted when the
/// requester has nothing for this doc yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequestEntry {
    pub doc_id: DocId,
    pub requester_doc_version: Option<VersionVector>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    pub docs: Vec<SyncRequestEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    pub doc_id: DocId,
    pub transmission: Transmission,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMsg {
    pub doc_id: DocId,
    pub transmission: Transmission,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub doc_id: DocId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteStatus {
    Deleted,
    Ignored,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub doc_id: DocId,
    pub status: DeleteStatus,
}

/// One peer's ephemeral namespace contribution, fanned out inside an
/// `ephemeral` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EphemeralStoreEntry {
    pub peer_id: docsync_types::PeerId,
    pub namespace: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EphemeralMsg {
    pub doc_id: DocId,
    pub hops_remaining: u8,
    pub stores: Vec<EphemeralStoreEntry>,
}

/// The payload of a `sync-response`/`update` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Transmission {
    /// Sender has no new data.
    UpToDate,
    /// Sender does not have the doc.
    NotFound,
    Snapshot { data: Vec<u8>, version: VersionVector },
    Update { data: Vec<u8>, version: VersionVector },
}

impl Transmission {
    #[must_use]
    pub fn version(&self) -> Option<&VersionVector> {
        match self {
            Transmission::Snapshot { version, .. } | Transmission::Update { version, .. } => {
                Some(version)
            }
            Transmission::UpToDate | Transmission::NotFound => None,
        }
    }

    #[must_use]
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Transmission::Snapshot { data, .. } | Transmission::Update { data, .. } => Some(data),
            Transmission::UpToDate | Transmission::NotFound => None,
        }
    }
}
