//! The Synchronizer: a transport-agnostic CRDT document synchronization
//! engine.
//!
//! This crate owns peer/channel/document bookkeeping, the wire protocol, and
//! the sync algorithm itself, but not the CRDT merge logic (that lives in
//! `docsync-doc`) and not any concrete network transport (embedders supply
//! one by implementing [`channel::Adapter`]).
//!
//! # Architecture
//!
//! - [`dispatcher`] is the pure core: `dispatch(&mut model, msg, &rules) ->
//!   Vec<Cmd>`. It never performs I/O and never blocks.
//! - [`effects::EffectRuntime`] is the imperative shell: it owns the
//!   adapters, the outbound [`batcher`] and the [`ephemeral`] stores, and
//!   executes the `Cmd`s the dispatcher returns.
//! - [`facade::Repo`] is the async, `Clone`-able handle embedders use: it
//!   wraps an `EffectRuntime` behind a `tokio::sync::Mutex` and adds
//!   `wait_for_sync`.
//!
//! # Example
//!
//! ```
//! use docsync_core::{AllowAllPermissions, ChannelKind, MemoryAdapter, Repo, SynchronizerConfig};
//! use docsync_types::Identity;
//!
//! # tokio_test::block_on(async {
//! let repo = Repo::new(
//!     Identity::user("alice", "Alice's Laptop"),
//!     AllowAllPermissions,
//!     SynchronizerConfig::default(),
//! );
//! let (adapter, _remote) = MemoryAdapter::pair("alice", "bob");
//! repo.add_adapter(Box::new(adapter), ChannelKind::Network).await;
//! # });
//! ```

pub mod batcher;
pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod effects;
pub mod ephemeral;
pub mod error;
pub mod facade;
pub mod memory_adapter;
pub mod model;
pub mod permission;
pub mod protocol;
pub mod wire;

pub use batcher::OutboundBatcher;
pub use channel::{Adapter, AdapterEvent, Envelope};
pub use config::SynchronizerConfig;
pub use dispatcher::{dispatch, Cmd, Msg};
pub use effects::EffectRuntime;
pub use ephemeral::{EphemeralStore, TimerlessStore};
pub use error::{SyncError, SyncResult};
pub use facade::Repo;
pub use memory_adapter::MemoryAdapter;
pub use model::{
    Awareness, Channel, ChannelKind, DocState, PeerState, ReadyState, ReadyStatus,
    SynchronizerModel,
};
pub use permission::{AllowAllPermissions, PermissionRules};
pub use protocol::{
    BatchMsg, DeleteRequest, DeleteResponse, DeleteStatus, DirectoryResponse, EphemeralMsg,
    EphemeralStoreEntry, EstablishRequest, EstablishResponse, NewDoc, ProtocolMsg, SyncRequest,
    SyncRequestEntry, SyncResponse, Transmission, UpdateMsg,
};
pub use wire::{decode_frame, encode_frame, WireError};
