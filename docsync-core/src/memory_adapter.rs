//! In-process loopback adapter.
//!
//! A reference implementation of [`Adapter`] used by tests and demos to
//! exercise the engine without a real transport. It is not a shipped
//! production transport (§1 Non-goals).

use crate::channel::{Adapter, Envelope};
use crate::error::{SyncError, SyncResult};
use crate::protocol::ProtocolMsg;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One end of an in-process, loopback channel pair. Cloning shares the same
/// underlying queues — tests use this to keep an external probe handle
/// after giving the original to a runtime.
#[derive(Debug, Clone)]
pub struct MemoryAdapter {
    id: String,
    incoming: Arc<Mutex<VecDeque<ProtocolMsg>>>,
    outgoing: Arc<Mutex<VecDeque<ProtocolMsg>>>,
    connected: Arc<Mutex<bool>>,
}

impl MemoryAdapter {
    /// Creates a connected pair: messages sent on one side appear as
    /// incoming on the other.
    #[must_use]
    pub fn pair(id_a: impl Into<String>, id_b: impl Into<String>) -> (Self, Self) {
        let queue_ab = Arc::new(Mutex::new(VecDeque::new()));
        let queue_ba = Arc::new(Mutex::new(VecDeque::new()));
        let connected = Arc::new(Mutex::new(true));

        let a = Self {
            id: id_a.into(),
            incoming: queue_ba.clone(),
            outgoing: queue_ab.clone(),
            connected: connected.clone(),
        };
        let b = Self {
            id: id_b.into(),
            incoming: queue_ab,
            outgoing: queue_ba,
            connected,
        };
        (a, b)
    }

    /// Pops the next message this adapter's peer should receive.
    pub fn take_outgoing(&self) -> Option<ProtocolMsg> {
        self.outgoing.lock().unwrap().pop_front()
    }

    /// Queues a message as if the remote side had sent it.
    pub fn queue_incoming(&self, message: ProtocolMsg) {
        self.incoming.lock().unwrap().push_back(message);
    }

    /// Pops the next message delivered to this adapter.
    pub fn take_incoming(&self) -> Option<ProtocolMsg> {
        self.incoming.lock().unwrap().pop_front()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        *self.connected.lock().unwrap()
    }
}

impl Adapter for MemoryAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn send(&self, envelope: Envelope) -> SyncResult<()> {
        if !self.is_connected() {
            return Err(SyncError::Transport(format!("{} is closed", self.id)));
        }
        self.outgoing.lock().unwrap().push_back(envelope.message);
        Ok(())
    }

    fn stop(&mut self) {
        *self.connected.lock().unwrap() = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_relays_messages_both_ways() {
        let (a, b) = MemoryAdapter::pair("a", "b");
        a.send(Envelope::to(
            docsync_types::ChannelId::from_raw(0),
            ProtocolMsg::DirectoryRequest,
        ))
        .unwrap();
        assert!(matches!(
            b.take_incoming(),
            Some(ProtocolMsg::DirectoryRequest)
        ));
        assert!(b.take_incoming().is_none());
    }

    #[test]
    fn stop_prevents_further_sends() {
        let (mut a, _b) = MemoryAdapter::pair("a", "b");
        a.stop();
        let err = a
            .send(Envelope::to(
                docsync_types::ChannelId::from_raw(0),
                ProtocolMsg::DirectoryRequest,
            ))
            .unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));
    }
}
