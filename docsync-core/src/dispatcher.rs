//! The pure state-machine reducer (§4.3–§4.6, §4.9).
//!
//! `dispatch` is total: `(model, msg) -> Vec<Cmd>`. It never returns a
//! `Result` — a malformed message (wrong channel state, unknown channel)
//! is logged and dropped, per §7's propagation policy. All I/O (sending
//! bytes, touching the ephemeral store, waking façade waiters) is deferred
//! to the `Cmd`s the effect runtime executes afterward.

use crate::channel::{AdapterEvent, Envelope};
use crate::model::{Awareness, Channel, ChannelKind, ReadyState, SynchronizerModel};
use crate::permission::PermissionRules;
use crate::protocol::{
    DeleteResponse, DeleteStatus, DirectoryResponse, EphemeralMsg, EphemeralStoreEntry,
    EstablishResponse, NewDoc, ProtocolMsg, SyncRequest, SyncRequestEntry, SyncResponse,
    Transmission, UpdateMsg,
};
use docsync_doc::Document;
use docsync_types::{ChannelId, DocId, Identity, PeerId};
use tracing::{debug, warn};

/// A relayed ephemeral message is dropped after this many additional hops,
/// bounding fan-out on dense subscription graphs.
const EPHEMERAL_MAX_HOPS: u8 = 3;

/// Everything that can drive a dispatch turn: an adapter-reported event, or
/// a request originating from the façade layer.
#[derive(Debug, Clone)]
pub enum Msg {
    Adapter(AdapterEvent),
    /// The façade created or loaded a document locally; announce it.
    EnsureDoc { doc_id: DocId, doc: Document },
    /// The façade deleted a document locally. Per the informational
    /// delete-request/response contract, this never fans out on the wire.
    DeleteDoc { doc_id: DocId },
    /// A local mutation landed on `doc_id` (outside of merging inbound
    /// data, which propagates on its own). Fans the change out to peers.
    LocalChange { doc_id: DocId },
    /// A heartbeat tick for this peer's own ephemeral contribution.
    EphemeralHeartbeat {
        doc_id: DocId,
        namespace: String,
        data: Vec<u8>,
    },
}

/// An effect the dispatcher decided on but does not itself perform.
#[derive(Debug, Clone)]
pub enum Cmd {
    /// Hand `envelope` to the effect runtime for delivery (direct or
    /// batched, per §4.7).
    Send(Envelope),
    /// The engine minted `channel_id` for a newly added adapter connection;
    /// the effect runtime needs this to route future sends to it.
    ChannelAssigned { channel_id: ChannelId, adapter_id: String },
    /// A document's per-channel ready state changed since the last emission.
    ReadyStateChanged {
        doc_id: DocId,
        ready_states: Vec<ReadyState>,
    },
    /// Every channel to `peer_id` is gone; drop its ephemeral contributions
    /// immediately rather than waiting out the timeout.
    RemoveEphemeralPeer { peer_id: PeerId },
    /// Apply an inbound ephemeral namespace update to the runtime's store.
    ApplyEphemeral {
        doc_id: DocId,
        peer_id: PeerId,
        namespace: String,
        data: Vec<u8>,
    },
}

/// Runs one dispatch turn.
pub fn dispatch(model: &mut SynchronizerModel, msg: Msg, rules: &dyn PermissionRules) -> Vec<Cmd> {
    let mut cmds = Vec::new();
    match msg {
        Msg::Adapter(event) => handle_adapter_event(model, event, rules, &mut cmds),
        Msg::EnsureDoc { doc_id, doc } => handle_ensure_doc(model, doc_id, doc, rules, &mut cmds),
        Msg::DeleteDoc { doc_id } => handle_delete_doc(model, doc_id, &mut cmds),
        Msg::LocalChange { doc_id } => {
            propagate_change(model, &doc_id, None, rules, &mut cmds);
            emit_ready_state_change(model, &doc_id, &mut cmds);
        }
        Msg::EphemeralHeartbeat { doc_id, namespace, data } => {
            handle_ephemeral_heartbeat(model, doc_id, namespace, data, &mut cmds);
        }
    }
    cmds
}

fn handle_adapter_event(
    model: &mut SynchronizerModel,
    event: AdapterEvent,
    rules: &dyn PermissionRules,
    cmds: &mut Vec<Cmd>,
) {
    match event {
        AdapterEvent::ChannelAdded { kind } => handle_channel_added(model, kind, cmds),
        AdapterEvent::ChannelEstablish { channel_id, remote_identity } => {
            if establish_channel(model, channel_id, remote_identity, rules, cmds) {
                emit_ready_state_change_all(model, cmds);
            }
        }
        AdapterEvent::ChannelReceive { channel_id, message } => {
            handle_receive(model, channel_id, message, rules, cmds);
        }
        AdapterEvent::ChannelRemoved { channel_id } => {
            handle_channel_removed(model, channel_id, cmds);
        }
    }
}

fn handle_channel_added(model: &mut SynchronizerModel, kind: ChannelKind, cmds: &mut Vec<Cmd>) {
    let channel_id = model.channel_ids.next();
    // The adapter id is assigned by the effect runtime when it registers the
    // adapter; here we only know the kind until `ChannelAssigned` round-trips
    // back with the concrete adapter, so we stash a placeholder id and let
    // the effect runtime correct the mapping on its side.
    let adapter_id = channel_id.to_string();
    model.channels.insert(
        channel_id,
        Channel::Pending {
            channel_id,
            adapter_id: adapter_id.clone(),
            kind,
        },
    );
    cmds.push(Cmd::ChannelAssigned { channel_id, adapter_id });

    match kind {
        ChannelKind::Storage => {
            let identity = Identity::local_storage(PeerId::new(format!("storage-{channel_id}")));
            model.channels.insert(
                channel_id,
                Channel::Established {
                    channel_id,
                    adapter_id: channel_id.to_string(),
                    kind,
                    peer_id: identity.peer_id.clone(),
                    remote_identity: identity.clone(),
                },
            );
            model.peer_state_mut(&identity).channels.insert(channel_id);
            emit_ready_state_change_all(model, cmds);
        }
        ChannelKind::Network => {
            cmds.push(Cmd::Send(Envelope::to(
                channel_id,
                ProtocolMsg::EstablishRequest(crate::protocol::EstablishRequest {
                    identity: model.identity.clone(),
                }),
            )));
        }
    }
}

/// Transitions a `Pending` channel to `Established`, running the
/// reconnection-optimization fan-out (§4.3). Returns whether a transition
/// actually happened (an already-established channel is a no-op).
fn establish_channel(
    model: &mut SynchronizerModel,
    channel_id: ChannelId,
    remote_identity: Identity,
    rules: &dyn PermissionRules,
    cmds: &mut Vec<Cmd>,
) -> bool {
    let Some(channel) = model.channels.get(&channel_id) else {
        warn!(%channel_id, "establish for unknown channel");
        return false;
    };
    if channel.is_established() {
        debug!(%channel_id, "duplicate establish, ignoring");
        return false;
    }
    let (adapter_id, kind) = (channel.adapter_id().to_string(), channel.kind());
    model.channels.insert(
        channel_id,
        Channel::Established {
            channel_id,
            adapter_id,
            kind,
            peer_id: remote_identity.peer_id.clone(),
            remote_identity: remote_identity.clone(),
        },
    );
    let peer_id = remote_identity.peer_id.clone();
    let peer_known_before = model.peers.contains_key(&peer_id);
    model.peer_state_mut(&remote_identity).channels.insert(channel_id);

    // Boundary behavior (§8): a reconnect with nothing new to say produces no
    // discovery or sync traffic at all. A doc only needs asking about again
    // if we've never talked to this peer, or our cached awareness of their
    // knowledge doesn't already cover our current version.
    let stale_docs: Vec<SyncRequestEntry> = model
        .documents
        .values()
        .filter(|ds| rules.visibility(&ds.doc_id, &ds.doc, &peer_id))
        .filter(|ds| {
            let caught_up = model
                .peers
                .get(&peer_id)
                .map(|p| p.awareness(&ds.doc_id))
                .and_then(|a| a.last_known_version().map(|v| ds.doc.version().leq(v)))
                .unwrap_or(false);
            !caught_up
        })
        .map(|ds| SyncRequestEntry {
            doc_id: ds.doc_id.clone(),
            requester_doc_version: Some(ds.doc.version()),
        })
        .collect();

    if !peer_known_before || !stale_docs.is_empty() {
        cmds.push(Cmd::Send(Envelope::to(channel_id, ProtocolMsg::DirectoryRequest)));
    }
    if !stale_docs.is_empty() {
        cmds.push(Cmd::Send(Envelope::to(
            channel_id,
            ProtocolMsg::SyncRequest(SyncRequest { docs: stale_docs }),
        )));
    }
    true
}

fn handle_channel_removed(model: &mut SynchronizerModel, channel_id: ChannelId, cmds: &mut Vec<Cmd>) {
    let Some(channel) = model.channels.remove(&channel_id) else {
        return;
    };
    if let Some(peer_id) = channel.peer_id().cloned() {
        if let Some(peer) = model.peers.get_mut(&peer_id) {
            peer.channels.remove(&channel_id);
            if peer.channels.is_empty() {
                cmds.push(Cmd::RemoveEphemeralPeer { peer_id });
            }
        }
    }
    emit_ready_state_change_all(model, cmds);
}

fn handle_receive(
    model: &mut SynchronizerModel,
    channel_id: ChannelId,
    message: ProtocolMsg,
    rules: &dyn PermissionRules,
    cmds: &mut Vec<Cmd>,
) {
    match message {
        ProtocolMsg::EstablishRequest(req) => {
            let already = model
                .channels
                .get(&channel_id)
                .map(Channel::is_established)
                .unwrap_or(false);
            if establish_channel(model, channel_id, req.identity, rules, cmds) {
                cmds.push(Cmd::Send(Envelope::to(
                    channel_id,
                    ProtocolMsg::EstablishResponse(EstablishResponse {
                        identity: model.identity.clone(),
                    }),
                )));
                emit_ready_state_change_all(model, cmds);
            } else if !already {
                warn!(%channel_id, "establish-request on unknown channel");
            }
        }
        ProtocolMsg::EstablishResponse(resp) => {
            if establish_channel(model, channel_id, resp.identity, rules, cmds) {
                emit_ready_state_change_all(model, cmds);
            }
        }
        ProtocolMsg::Batch(batch) => {
            for inner in batch.messages {
                handle_receive(model, channel_id, inner, rules, cmds);
            }
        }
        ProtocolMsg::DirectoryRequest => handle_directory_request(model, channel_id, rules, cmds),
        ProtocolMsg::DirectoryResponse(DirectoryResponse { doc_ids }) => {
            handle_discovered_docs(model, channel_id, doc_ids, cmds);
        }
        ProtocolMsg::NewDoc(NewDoc { doc_ids }) => {
            handle_discovered_docs(model, channel_id, doc_ids, cmds);
        }
        ProtocolMsg::SyncRequest(req) => handle_sync_request(model, channel_id, req, rules, cmds),
        ProtocolMsg::SyncResponse(SyncResponse { doc_id, transmission }) => {
            handle_transmission(model, channel_id, doc_id, transmission, rules, cmds, true);
        }
        ProtocolMsg::Update(UpdateMsg { doc_id, transmission }) => {
            handle_transmission(model, channel_id, doc_id, transmission, rules, cmds, false);
        }
        ProtocolMsg::DeleteRequest(req) => {
            if require_established(model, channel_id).is_some() {
                cmds.push(Cmd::Send(Envelope::to(
                    channel_id,
                    ProtocolMsg::DeleteResponse(DeleteResponse {
                        doc_id: req.doc_id,
                        status: DeleteStatus::Ignored,
                    }),
                )));
            }
        }
        ProtocolMsg::DeleteResponse(resp) => {
            debug!(doc_id = %resp.doc_id, status = ?resp.status, "peer delete-response (informational)");
        }
        ProtocolMsg::Ephemeral(msg) => handle_ephemeral_receive(model, channel_id, msg, cmds),
    }
}

/// Returns the peer id for an established channel, logging and returning
/// `None` for anything else (unknown channel, still-pending channel).
fn require_established(model: &SynchronizerModel, channel_id: ChannelId) -> Option<PeerId> {
    match model.channels.get(&channel_id) {
        Some(Channel::Established { peer_id, .. }) => Some(peer_id.clone()),
        Some(Channel::Pending { .. }) => {
            warn!(%channel_id, "dropped non-establishment message on pending channel");
            None
        }
        None => {
            warn!(%channel_id, "message for unknown channel");
            None
        }
    }
}

fn handle_directory_request(
    model: &SynchronizerModel,
    channel_id: ChannelId,
    rules: &dyn PermissionRules,
    cmds: &mut Vec<Cmd>,
) {
    let Some(peer_id) = require_established(model, channel_id) else {
        return;
    };
    let doc_ids: Vec<DocId> = model
        .documents
        .iter()
        .filter(|(id, ds)| rules.visibility(id, &ds.doc, &peer_id))
        .map(|(id, _)| id.clone())
        .collect();
    for chunk in doc_ids.chunks(model.max_fanout_size.max(1)) {
        cmds.push(Cmd::Send(Envelope::to(
            channel_id,
            ProtocolMsg::DirectoryResponse(DirectoryResponse { doc_ids: chunk.to_vec() }),
        )));
    }
}

/// Shared by `directory-response` and `new-doc`: request sync for every
/// announced id, creating a placeholder document for any we don't have.
fn handle_discovered_docs(
    model: &mut SynchronizerModel,
    channel_id: ChannelId,
    doc_ids: Vec<DocId>,
    cmds: &mut Vec<Cmd>,
) {
    let Some(peer_id) = require_established(model, channel_id) else {
        return;
    };
    if doc_ids.is_empty() {
        return;
    }
    let identity = peer_state_identity(model, &peer_id);
    let mut entries = Vec::with_capacity(doc_ids.len());
    for doc_id in &doc_ids {
        let requester_doc_version = model.documents.get(doc_id).map(|ds| ds.doc.version());
        entries.push(SyncRequestEntry {
            doc_id: doc_id.clone(),
            requester_doc_version,
        });
        model
            .peer_state_mut(&identity)
            .set_awareness(doc_id.clone(), Awareness::Pending);
    }
    for chunk in entries.chunks(model.max_fanout_size.max(1)) {
        cmds.push(Cmd::Send(Envelope::to(
            channel_id,
            ProtocolMsg::SyncRequest(SyncRequest { docs: chunk.to_vec() }),
        )));
    }
    for doc_id in &doc_ids {
        emit_ready_state_change(model, doc_id, cmds);
    }
}

fn handle_sync_request(
    model: &mut SynchronizerModel,
    channel_id: ChannelId,
    req: SyncRequest,
    rules: &dyn PermissionRules,
    cmds: &mut Vec<Cmd>,
) {
    let Some(peer_id) = require_established(model, channel_id) else {
        return;
    };
    let max_fanout_size = model.max_fanout_size.max(1);
    if req.docs.len() > max_fanout_size {
        debug!(
            %channel_id,
            requested = req.docs.len(),
            max_fanout_size,
            "sync-request exceeds fan-out cap, processing this turn's share only"
        );
    }
    for entry in req.docs.into_iter().take(max_fanout_size) {
        let doc_id = entry.doc_id;
        let visible = model
            .documents
            .get(&doc_id)
            .map(|ds| rules.visibility(&doc_id, &ds.doc, &peer_id))
            .unwrap_or(false);
        let transmission = match model.documents.get(&doc_id) {
            Some(ds) if visible => {
                let our_version = ds.doc.version();
                match &entry.requester_doc_version {
                    None => match ds.doc.export_snapshot() {
                        Ok(data) => Transmission::Snapshot { data, version: our_version },
                        Err(e) => {
                            warn!(%doc_id, error = %e, "snapshot export failed");
                            continue;
                        }
                    },
                    Some(requester_version) if our_version.leq(requester_version) => {
                        Transmission::UpToDate
                    }
                    Some(requester_version) if ds.mergeable => match ds.doc.export_since(requester_version) {
                        Ok(data) => Transmission::Update { data, version: our_version },
                        Err(e) => {
                            warn!(%doc_id, error = %e, "delta export failed");
                            continue;
                        }
                    },
                    Some(_) => match ds.doc.export_snapshot() {
                        Ok(data) => Transmission::Snapshot { data, version: our_version },
                        Err(e) => {
                            warn!(%doc_id, error = %e, "snapshot export failed");
                            continue;
                        }
                    },
                }
            }
            // Invisible to this peer: report up-to-date rather than not-found, so the
            // peer can't tell a hidden document apart from one that doesn't exist.
            Some(_) => Transmission::UpToDate,
            None => Transmission::NotFound,
        };

        // Only a genuinely visible document updates subscription/awareness
        // bookkeeping — the hidden-but-up-to-date case above must look
        // exactly like "doesn't exist" from the peer's state-tracking
        // perspective too, not just on the wire.
        if visible && !matches!(transmission, Transmission::NotFound) {
            let known_version = transmission
                .version()
                .cloned()
                .unwrap_or_else(|| entry.requester_doc_version.clone().unwrap_or_default());
            let peer = model.peer_state_mut(&peer_state_identity(model, &peer_id));
            peer.subscriptions.insert(doc_id.clone());
            peer.set_awareness(doc_id.clone(), Awareness::Synced { last_known_version: known_version });
        }

        cmds.push(Cmd::Send(Envelope::to(
            channel_id,
            ProtocolMsg::SyncResponse(SyncResponse { doc_id, transmission }),
        )));
    }
}

/// Looks up the identity already on file for a peer, falling back to a
/// minimal placeholder — used only to satisfy `peer_state_mut`'s signature
/// when we already know the peer exists.
fn peer_state_identity(model: &SynchronizerModel, peer_id: &PeerId) -> Identity {
    model
        .peers
        .get(peer_id)
        .map(|p| p.identity.clone())
        .unwrap_or_else(|| Identity::local_storage(peer_id.clone()))
}

fn handle_transmission(
    model: &mut SynchronizerModel,
    channel_id: ChannelId,
    doc_id: DocId,
    transmission: Transmission,
    rules: &dyn PermissionRules,
    cmds: &mut Vec<Cmd>,
    is_initial_sync: bool,
) {
    let Some(peer_id) = require_established(model, channel_id) else {
        return;
    };

    match &transmission {
        Transmission::NotFound => {
            model
                .peer_state_mut(&peer_state_identity(model, &peer_id))
                .set_awareness(doc_id.clone(), Awareness::Absent);
            emit_ready_state_change(model, &doc_id, cmds);
            return;
        }
        Transmission::UpToDate => {
            if let Some(version) = model.documents.get(&doc_id).map(|ds| ds.doc.version()) {
                model
                    .peer_state_mut(&peer_state_identity(model, &peer_id))
                    .set_awareness(doc_id.clone(), Awareness::Synced { last_known_version: version });
            }
            return;
        }
        Transmission::Snapshot { .. } | Transmission::Update { .. } => {}
    }

    let version = transmission.version().cloned().unwrap_or_default();
    model
        .peer_state_mut(&peer_state_identity(model, &peer_id))
        .set_awareness(doc_id.clone(), Awareness::Synced { last_known_version: version });

    let allowed = {
        let identity = model.identity.clone();
        model
            .documents
            .get(&doc_id)
            .map(|ds| rules.mutability(&doc_id, &ds.doc, &identity.peer_id))
            .unwrap_or(true)
    };
    if !allowed {
        debug!(%doc_id, %peer_id, "mutability denied, dropping payload");
        return;
    }

    let data = transmission.data().unwrap_or(&[]);
    if !model.documents.contains_key(&doc_id) {
        match transmission {
            Transmission::Snapshot { .. } => {
                let mut doc = Document::new(model.identity.peer_id.clone());
                if let Err(e) = doc.import(data) {
                    warn!(%doc_id, error = %e, "snapshot import failed");
                    return;
                }
                model
                    .documents
                    .insert(doc_id.clone(), crate::model::DocState::new(doc_id.clone(), doc));
            }
            Transmission::Update { .. } => {
                warn!(%doc_id, "received update for a document we don't have, ignoring");
                return;
            }
            Transmission::NotFound | Transmission::UpToDate => unreachable!(),
        }
    } else if let Some(ds) = model.documents.get_mut(&doc_id) {
        if let Err(e) = ds.doc.import(data) {
            warn!(%doc_id, error = %e, "import failed");
            return;
        }
    }

    if is_initial_sync {
        broadcast_local_ephemeral(model, channel_id, &doc_id, cmds);
    }

    propagate_change(model, &doc_id, Some(channel_id), rules, cmds);
    emit_ready_state_change(model, &doc_id, cmds);
}

/// Sends our full local ephemeral contribution for `doc_id` to one peer,
/// done once on the initial sync-response import (§4.5): `update` frames
/// never trigger this, since the peer already has whatever we sent them
/// at sync time and heartbeats carry the rest.
fn broadcast_local_ephemeral(
    model: &SynchronizerModel,
    channel_id: ChannelId,
    doc_id: &DocId,
    cmds: &mut Vec<Cmd>,
) {
    let Some(store) = model.local_ephemeral.get(doc_id) else {
        return;
    };
    if store.is_empty() {
        return;
    }
    let stores = store
        .encode()
        .into_iter()
        .map(|(namespace, data)| EphemeralStoreEntry {
            peer_id: model.identity.peer_id.clone(),
            namespace,
            data,
        })
        .collect();
    cmds.push(Cmd::Send(Envelope::to(
        channel_id,
        ProtocolMsg::Ephemeral(EphemeralMsg {
            doc_id: doc_id.clone(),
            hops_remaining: EPHEMERAL_MAX_HOPS,
            stores,
        }),
    )));
}

fn handle_ensure_doc(
    model: &mut SynchronizerModel,
    doc_id: DocId,
    doc: Document,
    rules: &dyn PermissionRules,
    cmds: &mut Vec<Cmd>,
) {
    if model.documents.contains_key(&doc_id) {
        return;
    }
    model
        .documents
        .insert(doc_id.clone(), crate::model::DocState::new(doc_id.clone(), doc));
    propagate_change(model, &doc_id, None, rules, cmds);
    emit_ready_state_change(model, &doc_id, cmds);
}

fn handle_delete_doc(model: &mut SynchronizerModel, doc_id: DocId, cmds: &mut Vec<Cmd>) {
    model.documents.remove(&doc_id);
    emit_ready_state_change(model, &doc_id, cmds);
}

fn handle_ephemeral_heartbeat(
    model: &mut SynchronizerModel,
    doc_id: DocId,
    namespace: String,
    data: Vec<u8>,
    cmds: &mut Vec<Cmd>,
) {
    model
        .local_ephemeral
        .entry(doc_id.clone())
        .or_default()
        .set(namespace.clone(), data.clone());

    let stores = vec![EphemeralStoreEntry {
        peer_id: model.identity.peer_id.clone(),
        namespace,
        data,
    }];
    for channel in model.established_channels() {
        let Some(peer_id) = channel.peer_id() else { continue };
        let subscribed = model
            .peers
            .get(peer_id)
            .map(|p| p.subscriptions.contains(&doc_id))
            .unwrap_or(false);
        if !subscribed {
            continue;
        }
        cmds.push(Cmd::Send(Envelope::to(
            channel.channel_id(),
            ProtocolMsg::Ephemeral(EphemeralMsg {
                doc_id: doc_id.clone(),
                hops_remaining: EPHEMERAL_MAX_HOPS,
                stores: stores.clone(),
            }),
        )));
    }
}

fn handle_ephemeral_receive(
    model: &SynchronizerModel,
    channel_id: ChannelId,
    msg: EphemeralMsg,
    cmds: &mut Vec<Cmd>,
) {
    if require_established(model, channel_id).is_none() {
        return;
    }
    for entry in &msg.stores {
        cmds.push(Cmd::ApplyEphemeral {
            doc_id: msg.doc_id.clone(),
            peer_id: entry.peer_id.clone(),
            namespace: entry.namespace.clone(),
            data: entry.data.clone(),
        });
    }
    if msg.hops_remaining == 0 {
        return;
    }
    for channel in model.established_channels() {
        if channel.channel_id() == channel_id {
            continue;
        }
        let Some(peer_id) = channel.peer_id() else { continue };
        let subscribed = model
            .peers
            .get(peer_id)
            .map(|p| p.subscriptions.contains(&msg.doc_id))
            .unwrap_or(false);
        if !subscribed {
            continue;
        }
        cmds.push(Cmd::Send(Envelope::to(
            channel.channel_id(),
            ProtocolMsg::Ephemeral(EphemeralMsg {
                doc_id: msg.doc_id.clone(),
                hops_remaining: msg.hops_remaining - 1,
                stores: msg.stores.clone(),
            }),
        )));
    }
}

/// Local-change fan-out table (§4.6): per established peer (excluding the
/// channel the change arrived on, if any), decide between an update, a
/// snapshot, a bare announcement, or nothing.
fn propagate_change(
    model: &mut SynchronizerModel,
    doc_id: &DocId,
    source_channel: Option<ChannelId>,
    rules: &dyn PermissionRules,
    cmds: &mut Vec<Cmd>,
) {
    let Some((our_version, mergeable)) = model
        .documents
        .get(doc_id)
        .map(|ds| (ds.doc.version(), ds.mergeable))
    else {
        return;
    };

    let targets: Vec<(ChannelId, PeerId)> = model
        .established_channels()
        .filter(|c| Some(c.channel_id()) != source_channel)
        .filter_map(|c| c.peer_id().map(|p| (c.channel_id(), p.clone())))
        .collect();

    for (channel_id, peer_id) in targets {
        let visible = model
            .documents
            .get(doc_id)
            .map(|ds| rules.visibility(doc_id, &ds.doc, &peer_id))
            .unwrap_or(false);
        if !visible {
            continue;
        }

        let (subscribed, awareness) = match model.peers.get(&peer_id) {
            Some(peer) => (peer.subscriptions.contains(doc_id), peer.awareness(doc_id).clone()),
            None => (false, Awareness::Unknown),
        };

        if subscribed {
            let transmission = match &awareness {
                Awareness::Absent | Awareness::Unknown | Awareness::Pending => {
                    match model.documents.get(doc_id).and_then(|ds| ds.doc.export_snapshot().ok()) {
                        Some(data) => Transmission::Snapshot { data, version: our_version.clone() },
                        None => continue,
                    }
                }
                Awareness::Synced { last_known_version } => {
                    if !mergeable {
                        match model.documents.get(doc_id).and_then(|ds| ds.doc.export_snapshot().ok()) {
                            Some(data) => Transmission::Snapshot { data, version: our_version.clone() },
                            None => continue,
                        }
                    } else {
                        let delta = model
                            .documents
                            .get(doc_id)
                            .and_then(|ds| ds.doc.export_since(last_known_version).ok());
                        match delta {
                            Some(data) if !data.is_empty() => {
                                Transmission::Update { data, version: our_version.clone() }
                            }
                            _ => continue, // already caught up, nothing to send
                        }
                    }
                }
            };
            cmds.push(Cmd::Send(Envelope::to(
                channel_id,
                ProtocolMsg::Update(UpdateMsg { doc_id: doc_id.clone(), transmission }),
            )));
            if let Some(peer) = model.peers.get_mut(&peer_id) {
                peer.set_awareness(doc_id.clone(), Awareness::Synced { last_known_version: our_version.clone() });
            }
        } else {
            let should_announce = match &awareness {
                Awareness::Absent => false,
                Awareness::Synced { last_known_version } => !our_version.leq(last_known_version),
                Awareness::Unknown | Awareness::Pending => true,
            };
            if should_announce {
                cmds.push(Cmd::Send(Envelope::to(
                    channel_id,
                    ProtocolMsg::NewDoc(NewDoc { doc_ids: vec![doc_id.clone()] }),
                )));
            }
        }
    }
}

fn emit_ready_state_change(model: &mut SynchronizerModel, doc_id: &DocId, cmds: &mut Vec<Cmd>) {
    let ready_states = model.ready_states_for(doc_id);
    let changed = model.last_ready_states.get(doc_id) != Some(&ready_states);
    if changed {
        model.last_ready_states.insert(doc_id.clone(), ready_states.clone());
        cmds.push(Cmd::ReadyStateChanged { doc_id: doc_id.clone(), ready_states });
    }
}

fn emit_ready_state_change_all(model: &mut SynchronizerModel, cmds: &mut Vec<Cmd>) {
    let doc_ids: Vec<DocId> = model.documents.keys().cloned().collect();
    for doc_id in doc_ids {
        emit_ready_state_change(model, &doc_id, cmds);
    }
}
