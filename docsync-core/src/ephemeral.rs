//! Ephemeral (presence/cursor) subsystem (§4.8).
//!
//! Each document has per-namespace ephemeral state. The *local* side is a
//! `TimerlessStore`: it never expires its own entries, because this peer
//! knows it is still alive. Remote peers' contributions are held in an
//! `EphemeralStore`, which times entries out if no heartbeat refreshes
//! them — because a peer that stops heartbeating may simply be gone.

use docsync_types::{HybridTimestamp, PeerId};
use std::collections::HashMap;
use std::time::Duration;

/// This peer's own ephemeral data, namespaced (e.g. `"presence"`, `"cursor"`).
/// Never expires locally; heartbeats re-stamp it for remote consumption.
#[derive(Debug, Clone, Default)]
pub struct TimerlessStore {
    entries: HashMap<String, Vec<u8>>,
}

impl TimerlessStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, namespace: impl Into<String>, data: Vec<u8>) {
        self.entries.insert(namespace.into(), data);
    }

    pub fn clear(&mut self, namespace: &str) {
        self.entries.remove(namespace);
    }

    /// Refreshes the store ahead of a heartbeat send. The local store
    /// itself carries no timestamps to bump — freshness is conveyed by
    /// stamping the *encoded* frame at send time (see `encode`) — this
    /// exists so callers have an explicit heartbeat tick to hook into.
    pub fn touch(&mut self) {}

    /// Encodes every namespace entry for fan-out to subscribers.
    #[must_use]
    pub fn encode(&self) -> Vec<(String, Vec<u8>)> {
        self.entries
            .iter()
            .map(|(ns, data)| (ns.clone(), data.clone()))
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone)]
struct TimedEntry {
    data: Vec<u8>,
    updated_at: HybridTimestamp,
}

/// View of remote peers' ephemeral contributions for one document.
/// Entries expire `timeout` after their last refresh.
#[derive(Debug, Clone)]
pub struct EphemeralStore {
    entries: HashMap<PeerId, HashMap<String, TimedEntry>>,
    timeout: Duration,
}

impl EphemeralStore {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            timeout,
        }
    }

    /// Applies a freshly-received namespace update from `peer_id`, stamped
    /// with the local receive time (not the sender's clock — the whole
    /// point of the timerless design is that receipt itself is the
    /// freshness signal).
    pub fn apply(&mut self, peer_id: PeerId, namespace: String, data: Vec<u8>, now: HybridTimestamp) {
        self.entries
            .entry(peer_id)
            .or_default()
            .insert(namespace, TimedEntry { data, updated_at: now });
    }

    /// Drops all entries for a peer immediately, used when every channel
    /// to that peer is lost (liveness rule, §4.8) rather than waiting for
    /// the timeout.
    pub fn remove_peer(&mut self, peer_id: &PeerId) {
        self.entries.remove(peer_id);
    }

    /// Returns the live (non-expired) namespaces for a peer as of `now`.
    #[must_use]
    pub fn view(&self, peer_id: &PeerId, now: HybridTimestamp) -> HashMap<String, Vec<u8>> {
        self.entries
            .get(peer_id)
            .map(|namespaces| {
                namespaces
                    .iter()
                    .filter(|(_, entry)| !Self::expired(entry, now, self.timeout))
                    .map(|(ns, entry)| (ns.clone(), entry.data.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Removes every entry that has exceeded the timeout as of `now`.
    pub fn prune_expired(&mut self, now: HybridTimestamp) {
        let timeout = self.timeout;
        self.entries.retain(|_, namespaces| {
            namespaces.retain(|_, entry| !Self::expired(entry, now, timeout));
            !namespaces.is_empty()
        });
    }

    fn expired(entry: &TimedEntry, now: HybridTimestamp, timeout: Duration) -> bool {
        let elapsed_ms = now.wall_time().saturating_sub(entry.updated_at.wall_time());
        elapsed_ms > timeout.as_millis() as u64
    }
}
