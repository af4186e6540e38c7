use docsync_types::{ChannelId, ChannelIdAllocator, DocId, PeerId};
use std::collections::HashSet;

// ── PeerId ────────────────────────────────────────────────────────

#[test]
fn peer_id_equality_by_string() {
    let a = PeerId::new("peer-a");
    let b = PeerId::from("peer-a");
    assert_eq!(a, b);
}

#[test]
fn peer_id_distinct_strings_are_distinct() {
    let a = PeerId::new("peer-a");
    let b = PeerId::new("peer-b");
    assert_ne!(a, b);
}

#[test]
fn peer_id_display_round_trips_through_as_str() {
    let id = PeerId::new("peer-xyz");
    assert_eq!(id.to_string(), id.as_str());
}

#[test]
fn peer_id_hash_and_eq() {
    let a = PeerId::new("peer-a");
    let b = PeerId::new("peer-a");
    let mut set = HashSet::new();
    set.insert(a);
    set.insert(b);
    assert_eq!(set.len(), 1);
}

#[test]
fn peer_id_ord_is_lexicographic() {
    let a = PeerId::new("alice");
    let b = PeerId::new("bob");
    assert!(a < b);
}

#[test]
fn peer_id_serde_roundtrip() {
    let id = PeerId::new("peer-json");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"peer-json\"");
    let parsed: PeerId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn peer_id_from_owned_string() {
    let owned = String::from("peer-owned");
    let id = PeerId::from(owned.clone());
    assert_eq!(id.as_str(), owned);
}

// ── DocId ─────────────────────────────────────────────────────────

#[test]
fn doc_id_equality_by_string() {
    let a = DocId::new("doc-1");
    let b = DocId::from("doc-1");
    assert_eq!(a, b);
}

#[test]
fn doc_id_serde_roundtrip() {
    let id = DocId::new("doc-json");
    let json = serde_json::to_string(&id).unwrap();
    let parsed: DocId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn doc_id_distinct_from_peer_id_namespace() {
    // same underlying string, different newtypes: no accidental conflation.
    let doc = DocId::new("shared-name");
    let peer = PeerId::new("shared-name");
    assert_eq!(doc.as_str(), peer.as_str());
}

// ── ChannelId / ChannelIdAllocator ──────────────────────────────────

#[test]
fn channel_id_allocator_is_monotonic() {
    let alloc = ChannelIdAllocator::new();
    let a = alloc.next();
    let b = alloc.next();
    let c = alloc.next();
    assert!(a < b);
    assert!(b < c);
}

#[test]
fn channel_id_allocator_never_repeats() {
    let alloc = ChannelIdAllocator::new();
    let mut seen = HashSet::new();
    for _ in 0..100 {
        assert!(seen.insert(alloc.next()));
    }
}

#[test]
fn channel_id_display_format() {
    let id = ChannelId::from_raw(7);
    assert_eq!(id.to_string(), "channel#7");
}

#[test]
fn channel_id_as_raw_roundtrip() {
    let id = ChannelId::from_raw(42);
    assert_eq!(id.as_raw(), 42);
}

#[test]
fn channel_id_allocators_are_independent() {
    let a = ChannelIdAllocator::new();
    let b = ChannelIdAllocator::new();
    assert_eq!(a.next(), b.next());
}
