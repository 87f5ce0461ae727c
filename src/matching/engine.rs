//! # Matching Engine
//!
//! Resolves a document to the set of rooms whose filters it satisfies.
//!
//! Matching is read-only and proportional to the fields present in the
//! document, not to the number of registered filters: only the buckets for
//! present fields (plus `_id` and the namespace-wide bucket) are visited,
//! and each candidate room's full AST is evaluated once.

use std::collections::HashSet;

use super::index::FilterIndex;
use crate::types::{Document, Namespace, RoomId};

/// Match a document against every live filter in a namespace.
pub fn match_document(
    index: &FilterIndex,
    namespace: &Namespace,
    doc: &Document<'_>,
) -> HashSet<RoomId> {
    let mut candidates: HashSet<RoomId> = HashSet::new();

    let mut consider = |rooms: &HashSet<RoomId>| {
        for room in rooms {
            candidates.insert(room.clone());
        }
    };

    if let Some(body) = doc.body.as_object() {
        for field in body.keys() {
            for entry in index.field_predicates(namespace, field) {
                if entry.predicate.evaluate(doc) {
                    consider(&entry.rooms);
                }
            }
        }
    }

    for entry in index.field_predicates(namespace, "_id") {
        if entry.predicate.evaluate(doc) {
            consider(&entry.rooms);
        }
    }

    for entry in index.unfielded_predicates(namespace) {
        if entry.predicate.evaluate(doc) {
            consider(&entry.rooms);
        }
    }

    // Predicate prefiltering is an optimization; the room's full AST decides.
    candidates.retain(|room_id| {
        let filter = index.room_filter(room_id);
        debug_assert!(filter.is_some(), "predicate references unknown room");
        filter.map(|f| f.evaluate(doc)).unwrap_or(false)
    });

    candidates
}
