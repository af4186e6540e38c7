//! The `Repo`/`Handle` façade (§4.10).
//!
//! The embedder-facing surface: register adapters, fetch or create
//! documents, mutate them, and await convergence with a peer or the
//! storage backend. Everything below is a thin async wrapper around one
//! [`EffectRuntime`] behind a `tokio::sync::Mutex` — the dispatcher itself
//! stays synchronous and single-threaded; this is only where the engine
//! meets an async embedder.

use crate::channel::{Adapter, AdapterEvent};
use crate::config::SynchronizerConfig;
use crate::effects::EffectRuntime;
use crate::error::{SyncError, SyncResult};
use crate::model::{ChannelKind, ReadyStatus};
use crate::permission::PermissionRules;
use docsync_doc::Document;
use docsync_types::{ChannelId, DocId, Identity};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

/// Shared handle to the synchronizer, cheaply cloned across tasks.
pub struct Repo<R: PermissionRules> {
    runtime: Arc<Mutex<EffectRuntime<R>>>,
    /// Woken after every dispatch turn so `wait_for_sync` can re-check
    /// ready state without polling on a fixed interval.
    notify: Arc<Notify>,
    default_deadline: Duration,
}

impl<R: PermissionRules> Clone for Repo<R> {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            notify: self.notify.clone(),
            default_deadline: self.default_deadline,
        }
    }
}

impl<R: PermissionRules> Repo<R> {
    #[must_use]
    pub fn new(identity: Identity, rules: R, config: SynchronizerConfig) -> Self {
        let default_deadline = config.wait_for_sync_default_deadline;
        Self {
            runtime: Arc::new(Mutex::new(EffectRuntime::new(identity, rules, &config))),
            notify: Arc::new(Notify::new()),
            default_deadline,
        }
    }

    pub async fn add_adapter(&self, adapter: Box<dyn Adapter>, kind: ChannelKind) -> ChannelId {
        let channel_id = self.runtime.lock().await.add_adapter(adapter, kind);
        self.notify.notify_waiters();
        channel_id
    }

    pub async fn remove_adapter(&self, channel_id: ChannelId) {
        self.runtime.lock().await.remove_adapter(channel_id);
        self.notify.notify_waiters();
    }

    /// Feeds an event raised by an adapter (received message, handshake
    /// completion, disconnect) into the engine.
    pub async fn handle_event(&self, event: AdapterEvent) {
        self.runtime.lock().await.handle_event(event);
        self.notify.notify_waiters();
    }

    /// Returns a clone of the current document state, if known locally.
    pub async fn get(&self, doc_id: &DocId) -> Option<Document> {
        self.runtime.lock().await.model().documents.get(doc_id).map(|ds| ds.doc.clone())
    }

    /// Registers a document that exists locally (freshly created or loaded
    /// from storage), announcing it to peers.
    pub async fn ensure(&self, doc_id: DocId, doc: Document) {
        self.runtime.lock().await.ensure_doc(doc_id, doc);
        self.notify.notify_waiters();
    }

    /// Removes local knowledge of a document. Per the informational
    /// delete-request/response contract this has no effect on peers.
    pub async fn delete(&self, doc_id: DocId) {
        self.runtime.lock().await.delete_doc(doc_id);
        self.notify.notify_waiters();
    }

    /// Applies `mutator` to the document in place and fans the change out.
    /// Returns `SyncError::Protocol` if the document isn't known locally.
    pub async fn mutate(&self, doc_id: &DocId, mutator: impl FnOnce(&mut Document)) -> SyncResult<()> {
        let mut guard = self.runtime.lock().await;
        let ds = guard
            .model_mut()
            .documents
            .get_mut(doc_id)
            .ok_or_else(|| SyncError::Protocol(format!("unknown document: {doc_id}")))?;
        mutator(&mut ds.doc);
        guard.local_change(doc_id.clone());
        drop(guard);
        self.notify.notify_waiters();
        Ok(())
    }

    pub async fn ephemeral_heartbeat(&self, doc_id: DocId, namespace: impl Into<String>, data: Vec<u8>) {
        self.runtime.lock().await.ephemeral_heartbeat(doc_id, namespace.into(), data);
        self.notify.notify_waiters();
    }

    pub async fn ephemeral_view(
        &self,
        doc_id: &DocId,
        peer_id: &docsync_types::PeerId,
    ) -> std::collections::HashMap<String, Vec<u8>> {
        self.runtime.lock().await.ephemeral_view(doc_id, peer_id)
    }

    /// Drops every adapter and all local document/peer state, as if the
    /// process had just started — used for logout and test teardown.
    pub async fn reset(&self) {
        self.runtime.lock().await.reset();
        self.notify.notify_waiters();
    }

    /// Waits until `doc_id` is `Synced` on at least one channel of `kind`,
    /// or the default deadline elapses.
    pub async fn wait_for_sync(&self, doc_id: &DocId, kind: ChannelKind) -> SyncResult<()> {
        self.wait_for_sync_with_deadline(doc_id, kind, self.default_deadline).await
    }

    pub async fn wait_for_sync_with_deadline(
        &self,
        doc_id: &DocId,
        kind: ChannelKind,
        deadline: Duration,
    ) -> SyncResult<()> {
        let start = tokio::time::Instant::now();
        loop {
            if self.is_synced(doc_id, kind).await {
                return Ok(());
            }
            let elapsed = start.elapsed();
            if elapsed >= deadline {
                return Err(SyncError::Timeout);
            }
            let remaining = deadline - elapsed;
            let _ = tokio::time::timeout(remaining, self.notify.notified()).await;
        }
    }

    async fn is_synced(&self, doc_id: &DocId, kind: ChannelKind) -> bool {
        let guard = self.runtime.lock().await;
        guard
            .model()
            .ready_states_for(doc_id)
            .into_iter()
            .any(|rs| rs.kind == kind && rs.status == ReadyStatus::Synced)
    }
}
