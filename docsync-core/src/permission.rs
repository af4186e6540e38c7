//! Permission predicates supplied by the embedder.
//!
//! The core has no built-in authentication (§1 Non-goals); it treats
//! permissions as pure, synchronous predicates it calls before every
//! disclosure or mutation-relevant decision.

use docsync_doc::Document;
use docsync_types::{DocId, PeerId};

/// `visibility`/`mutability` as documented in §4: pure predicates, no I/O.
pub trait PermissionRules: Send + Sync {
    /// Whether `peer` may learn this document exists / receive its data.
    fn visibility(&self, doc_id: &DocId, doc: &Document, peer: &PeerId) -> bool;

    /// Whether `peer` may have their changes merged in (a `sync-request`
    /// from a peer without mutability still gets an `up-to-date` reply,
    /// never a `not-found` or an error, to avoid leaking existence).
    fn mutability(&self, doc_id: &DocId, doc: &Document, peer: &PeerId) -> bool;
}

/// A permissive policy: every document is visible and mutable to every
/// peer. Suitable for tests and single-tenant embedders.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllPermissions;

impl PermissionRules for AllowAllPermissions {
    fn visibility(&self, _doc_id: &DocId, _doc: &Document, _peer: &PeerId) -> bool {
        true
    }

    fn mutability(&self, _doc_id: &DocId, _doc: &Document, _peer: &PeerId) -> bool {
        true
    }
}
