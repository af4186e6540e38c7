//! Synchronizer configuration.

use std::time::Duration;

/// Identity-independent tunables a host sets once and hands to the
/// synchronizer. Outbound batch flush is turn-boundary-driven and so has
/// no tunable here; the remaining fields are real parameters a host needs
/// to control.
#[derive(Debug, Clone)]
pub struct SynchronizerConfig {
    /// Interval between ephemeral-store heartbeats.
    pub ephemeral_heartbeat_interval: Duration,
    /// Default deadline for `waitForSync` when the caller doesn't supply one.
    pub wait_for_sync_default_deadline: Duration,
    /// Maximum number of docs to fan out in one `directory-response` or
    /// `sync-request` batch before splitting across turns.
    pub max_fanout_size: usize,
}

impl Default for SynchronizerConfig {
    fn default() -> Self {
        Self {
            ephemeral_heartbeat_interval: Duration::from_secs(15),
            wait_for_sync_default_deadline: Duration::from_secs(30),
            max_fanout_size: 256,
        }
    }
}
