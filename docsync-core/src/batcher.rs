//! Outbound batching (§4.7).
//!
//! Messages queued for the same channel within one dispatch turn are
//! coalesced: a single queued message goes out bare, two or more go out as
//! one `batch`. The flush point is the turn boundary, not a timer — the
//! effect runtime calls [`OutboundBatcher::flush`] once after it has run
//! every `Cmd` from a dispatch call, so messages queued by `Cmd`s that
//! execute during the flush itself land in a fresh buffer for the next
//! flush rather than being dropped or re-entrantly sent.

use crate::error::SyncError;
use crate::protocol::{BatchMsg, ProtocolMsg};
use docsync_types::ChannelId;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct OutboundBatcher {
    queues: HashMap<ChannelId, Vec<ProtocolMsg>>,
}

impl OutboundBatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, channel_id: ChannelId, message: ProtocolMsg) {
        self.queues.entry(channel_id).or_default().push(message);
    }

    /// Drains every queue, calling `send` once per channel with either the
    /// lone message or a `batch` of the coalesced messages. Returns the
    /// channels whose send failed, paired with the error; it does not
    /// retry — that is the adapter's job (§4.1).
    pub fn flush(
        &mut self,
        mut send: impl FnMut(ChannelId, ProtocolMsg) -> Result<(), SyncError>,
    ) -> Vec<(ChannelId, SyncError)> {
        let drained = std::mem::take(&mut self.queues);
        let mut failures = Vec::new();
        for (channel_id, mut messages) in drained {
            let message = if messages.len() == 1 {
                messages.pop().unwrap()
            } else {
                ProtocolMsg::Batch(BatchMsg { messages })
            };
            if let Err(e) = send(channel_id, message) {
                failures.push((channel_id, e));
            }
        }
        failures
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queues.values().all(Vec::is_empty)
    }
}
