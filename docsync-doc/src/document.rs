//! Multi-field document assembled from the CRDT primitives.
//!
//! A [`Document`] is a named collection of fields, each backed by one of the
//! primitive CRDTs in this crate. It tracks a single [`VersionVector`] across
//! all fields so a synchronizer can decide whether a peer needs a delta
//! without understanding any individual field's merge semantics.
//!
//! [`DocumentEngine`] is the capability surface an embedding engine actually
//! depends on: version/export/import, never the field-level CRDT types
//! directly. This keeps the document representation swappable without
//! touching the synchronization state machine.

use crate::{LWWRegister, ORSet, PNCounter, VersionVector, RGA};
use docsync_types::PeerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur while merging or (de)serializing a document.
#[derive(Debug, Error)]
pub enum DocError {
    #[error("merge failed: {0}")]
    Merge(String),
    #[error("unknown container: {0}")]
    UnknownContainer(String),
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// A single field's CRDT value.
///
/// Field kinds are fixed at write time; merging two documents that disagree
/// on a field's kind is a [`DocError::Merge`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FieldValue {
    Text(RGA<char>),
    Register(LWWRegister<serde_json::Value>),
    Tags(ORSet<String>),
    Counter(PNCounter),
}

impl FieldValue {
    fn kind(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Register(_) => "register",
            FieldValue::Tags(_) => "tags",
            FieldValue::Counter(_) => "counter",
        }
    }

    fn merge(&mut self, other: &FieldValue) -> Result<(), DocError> {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => {
                a.merge(b);
                Ok(())
            }
            (FieldValue::Register(a), FieldValue::Register(b)) => {
                a.merge(b);
                Ok(())
            }
            (FieldValue::Tags(a), FieldValue::Tags(b)) => {
                a.merge(b);
                Ok(())
            }
            (FieldValue::Counter(a), FieldValue::Counter(b)) => {
                a.merge(b);
                Ok(())
            }
            (a, b) => Err(DocError::Merge(format!(
                "field kind mismatch: {} vs {}",
                a.kind(),
                b.kind()
            ))),
        }
    }
}

/// A capability surface over a CRDT document: version tracking plus
/// snapshot/delta export and import.
///
/// Export/import are defined to be idempotent and commutative on the
/// receiving side by contract: importing the same bytes twice, or importing
/// a snapshot and an overlapping delta in either order, converges to the
/// same state.
pub trait DocumentEngine {
    /// The document's current version vector.
    fn version(&self) -> VersionVector;

    /// Encodes the full document state.
    fn export_snapshot(&self) -> Result<Vec<u8>, DocError>;

    /// Encodes the state not yet reflected in `since`. Returns an empty
    /// buffer if `since` already dominates this document's version.
    fn export_since(&self, since: &VersionVector) -> Result<Vec<u8>, DocError>;

    /// Merges previously-exported bytes into this document.
    fn import(&mut self, data: &[u8]) -> Result<(), DocError>;
}

/// A document: a peer-owned bundle of named CRDT fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    peer_id: PeerId,
    fields: BTreeMap<String, FieldValue>,
    version: VersionVector,
}

impl Document {
    /// Creates an empty document owned by `peer_id`.
    #[must_use]
    pub fn new(peer_id: PeerId) -> Self {
        Self {
            peer_id,
            fields: BTreeMap::new(),
            version: VersionVector::new(),
        }
    }

    #[must_use]
    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        self.fields.get_mut(name)
    }

    #[must_use]
    pub fn field_names(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    /// Inserts or replaces a field and bumps the document's version.
    pub fn set_field(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
        self.touch();
    }

    /// Records a local change against this peer without touching any field
    /// directly (used after mutating a field obtained via [`Self::field_mut`]).
    pub fn touch(&mut self) {
        self.version.increment(&self.peer_id);
    }
}

impl DocumentEngine for Document {
    fn version(&self) -> VersionVector {
        self.version.clone()
    }

    fn export_snapshot(&self) -> Result<Vec<u8>, DocError> {
        Ok(serde_json::to_vec(self)?)
    }

    fn export_since(&self, since: &VersionVector) -> Result<Vec<u8>, DocError> {
        if self.version.leq(since) {
            return Ok(Vec::new());
        }
        // State-based CRDTs have no cheaper delta encoding than the full
        // state; callers decide whether to send at all by comparing
        // versions first (see `leq` above), matching the spec's
        // up-to-date/update branch.
        self.export_snapshot()
    }

    fn import(&mut self, data: &[u8]) -> Result<(), DocError> {
        if data.is_empty() {
            return Ok(());
        }
        let other: Document = serde_json::from_slice(data)?;
        for (name, value) in other.fields {
            match self.fields.get_mut(&name) {
                Some(existing) => existing.merge(&value)?,
                None => {
                    self.fields.insert(name, value);
                }
            }
        }
        self.version.merge(&other.version);
        Ok(())
    }
}
