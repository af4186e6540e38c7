//! The effect runtime.
//!
//! Owns the mutable [`SynchronizerModel`], the registered adapters, the
//! outbound batcher and the per-document ephemeral stores. Every public
//! method here funnels through `dispatch` and then executes the `Cmd`s it
//! returns — this is the only place in the crate that performs I/O.

use crate::batcher::OutboundBatcher;
use crate::channel::{Adapter, AdapterEvent, Envelope};
use crate::config::SynchronizerConfig;
use crate::dispatcher::{dispatch, Cmd, Msg};
use crate::ephemeral::EphemeralStore;
use crate::model::{ChannelKind, ReadyState, SynchronizerModel};
use crate::permission::PermissionRules;
use docsync_doc::Document;
use docsync_types::{ChannelId, DocId, HybridTimestamp, Identity};
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

pub struct EffectRuntime<R: PermissionRules> {
    model: SynchronizerModel,
    rules: R,
    adapters: HashMap<ChannelId, Box<dyn Adapter>>,
    batcher: OutboundBatcher,
    ephemeral: HashMap<DocId, EphemeralStore>,
    ephemeral_timeout: Duration,
    ready_state_log: Vec<(DocId, Vec<ReadyState>)>,
}

impl<R: PermissionRules> EffectRuntime<R> {
    #[must_use]
    pub fn new(identity: Identity, rules: R, config: &SynchronizerConfig) -> Self {
        Self {
            model: SynchronizerModel::with_max_fanout_size(identity, config.max_fanout_size),
            rules,
            adapters: HashMap::new(),
            batcher: OutboundBatcher::new(),
            ephemeral: HashMap::new(),
            ephemeral_timeout: config.ephemeral_heartbeat_interval * 3,
            ready_state_log: Vec::new(),
        }
    }

    #[must_use]
    pub fn model(&self) -> &SynchronizerModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut SynchronizerModel {
        &mut self.model
    }

    /// Registers a newly connected adapter and runs the resulting handshake
    /// fan-out. Returns the `ChannelId` the model minted for it.
    pub fn add_adapter(&mut self, adapter: Box<dyn Adapter>, kind: ChannelKind) -> ChannelId {
        let mut cmds = dispatch(&mut self.model, Msg::Adapter(AdapterEvent::ChannelAdded { kind }), &self.rules);
        let idx = cmds
            .iter()
            .position(|c| matches!(c, Cmd::ChannelAssigned { .. }))
            .expect("channel-added always yields channel-assigned");
        let Cmd::ChannelAssigned { channel_id, .. } = cmds.remove(idx) else {
            unreachable!()
        };
        self.adapters.insert(channel_id, adapter);
        self.run_cmds(cmds);
        channel_id
    }

    /// Removes and stops an adapter, surfacing the channel-removed event.
    pub fn remove_adapter(&mut self, channel_id: ChannelId) {
        if let Some(mut adapter) = self.adapters.remove(&channel_id) {
            adapter.stop();
        }
        self.handle_event(AdapterEvent::ChannelRemoved { channel_id });
    }

    /// Stops every adapter and rebuilds the model from scratch, keeping the
    /// identity and configured ephemeral timeout. Used for logout and test
    /// teardown.
    pub fn reset(&mut self) {
        for (_, mut adapter) in self.adapters.drain() {
            adapter.stop();
        }
        self.batcher = OutboundBatcher::new();
        self.ephemeral.clear();
        self.ready_state_log.clear();
        let identity = self.model.identity.clone();
        let max_fanout_size = self.model.max_fanout_size;
        self.model = SynchronizerModel::with_max_fanout_size(identity, max_fanout_size);
    }

    /// Feeds one adapter-raised event through the dispatcher.
    pub fn handle_event(&mut self, event: AdapterEvent) {
        let cmds = dispatch(&mut self.model, Msg::Adapter(event), &self.rules);
        self.run_cmds(cmds);
    }

    pub fn ensure_doc(&mut self, doc_id: DocId, doc: Document) {
        let cmds = dispatch(&mut self.model, Msg::EnsureDoc { doc_id, doc }, &self.rules);
        self.run_cmds(cmds);
    }

    pub fn delete_doc(&mut self, doc_id: DocId) {
        let cmds = dispatch(&mut self.model, Msg::DeleteDoc { doc_id }, &self.rules);
        self.run_cmds(cmds);
    }

    /// Notifies the engine that `doc_id` changed locally (the caller has
    /// already mutated it via [`Self::model_mut`]), triggering fan-out.
    pub fn local_change(&mut self, doc_id: DocId) {
        let cmds = dispatch(&mut self.model, Msg::LocalChange { doc_id }, &self.rules);
        self.run_cmds(cmds);
    }

    pub fn ephemeral_heartbeat(&mut self, doc_id: DocId, namespace: String, data: Vec<u8>) {
        let cmds = dispatch(
            &mut self.model,
            Msg::EphemeralHeartbeat { doc_id, namespace, data },
            &self.rules,
        );
        self.run_cmds(cmds);
    }

    /// The live (non-expired) ephemeral namespaces a peer has reported for
    /// `doc_id`.
    #[must_use]
    pub fn ephemeral_view(&self, doc_id: &DocId, peer_id: &docsync_types::PeerId) -> HashMap<String, Vec<u8>> {
        self.ephemeral
            .get(doc_id)
            .map(|store| store.view(peer_id, HybridTimestamp::now()))
            .unwrap_or_default()
    }

    /// Drains the ready-state-changed events accumulated since the last call.
    pub fn drain_ready_state_events(&mut self) -> Vec<(DocId, Vec<ReadyState>)> {
        std::mem::take(&mut self.ready_state_log)
    }

    fn run_cmds(&mut self, cmds: Vec<Cmd>) {
        for cmd in cmds {
            match cmd {
                Cmd::Send(envelope) => {
                    let Envelope { to_channel_ids, message } = envelope;
                    for channel_id in to_channel_ids {
                        self.batcher.enqueue(channel_id, message.clone());
                    }
                }
                Cmd::ChannelAssigned { channel_id, .. } => {
                    warn!(%channel_id, "unexpected channel-assigned outside add_adapter");
                }
                Cmd::ReadyStateChanged { doc_id, ready_states } => {
                    self.ready_state_log.push((doc_id, ready_states));
                }
                Cmd::RemoveEphemeralPeer { peer_id } => {
                    for store in self.ephemeral.values_mut() {
                        store.remove_peer(&peer_id);
                    }
                }
                Cmd::ApplyEphemeral { doc_id, peer_id, namespace, data } => {
                    let timeout = self.ephemeral_timeout;
                    self.ephemeral
                        .entry(doc_id)
                        .or_insert_with(|| EphemeralStore::new(timeout))
                        .apply(peer_id, namespace, data, HybridTimestamp::now());
                }
            }
        }

        let adapters = &self.adapters;
        let failures = self.batcher.flush(|channel_id, message| match adapters.get(&channel_id) {
            Some(adapter) => adapter.send(Envelope::to(channel_id, message)),
            None => Err(crate::error::SyncError::UnknownChannel(channel_id)),
        });
        for (channel_id, err) in failures {
            warn!(%channel_id, %err, "outbound send failed");
        }
    }
}
