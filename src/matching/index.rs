//! # Matching Index
//!
//! Maps (namespace, field, operator signature) to compiled predicates and
//! their subscriber rooms. Every level cascades away when it empties, so
//! lookup cost stays proportional to live subscriptions only.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::filter::{CompiledFilter, CompiledPredicate, FilterExpression, PredicateKey};
use crate::types::{Namespace, RoomId};

/// A compiled predicate and the rooms subscribed to it
#[derive(Debug)]
pub struct PredicateEntry {
    /// The shared predicate
    pub predicate: CompiledPredicate,
    /// Rooms whose filters reference this predicate
    pub rooms: HashSet<RoomId>,
}

#[derive(Debug, Default)]
struct NamespaceBuckets {
    /// Field-scoped predicates, bucketed by the root path segment
    fields: HashMap<String, HashMap<PredicateKey, PredicateEntry>>,
    /// Namespace-wide predicates (negated leaves, `missing`)
    unfielded: HashMap<PredicateKey, PredicateEntry>,
}

impl NamespaceBuckets {
    fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.unfielded.is_empty()
    }
}

#[derive(Debug)]
struct IndexedRoom {
    namespace: Namespace,
    filter: Arc<FilterExpression>,
    /// (bucket, key) pairs for removal without recompilation
    predicate_refs: Vec<(Option<String>, PredicateKey)>,
}

/// The filter index: predicate buckets plus per-room filter ASTs
#[derive(Debug, Default)]
pub struct FilterIndex {
    namespaces: HashMap<Namespace, NamespaceBuckets>,
    rooms: HashMap<RoomId, IndexedRoom>,
}

impl FilterIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a compiled filter's room and predicates.
    ///
    /// Idempotent: inserting an already-indexed room is a no-op.
    pub fn insert_room(&mut self, compiled: &CompiledFilter) {
        if self.rooms.contains_key(&compiled.room_id) {
            return;
        }

        let buckets = self.namespaces.entry(compiled.namespace.clone()).or_default();
        let mut predicate_refs = Vec::with_capacity(compiled.predicates.len());

        for predicate in &compiled.predicates {
            let slot = match &predicate.field {
                Some(field) => buckets.fields.entry(field.clone()).or_default(),
                None => &mut buckets.unfielded,
            };
            slot.entry(predicate.key.clone())
                .or_insert_with(|| PredicateEntry {
                    predicate: predicate.clone(),
                    rooms: HashSet::new(),
                })
                .rooms
                .insert(compiled.room_id.clone());
            predicate_refs.push((predicate.field.clone(), predicate.key.clone()));
        }

        self.rooms.insert(
            compiled.room_id.clone(),
            IndexedRoom {
                namespace: compiled.namespace.clone(),
                filter: Arc::clone(&compiled.filter),
                predicate_refs,
            },
        );
    }

    /// Drop a room and every predicate reference it holds, cascading empty
    /// predicate, field, and namespace entries away.
    pub fn remove_room(&mut self, room_id: &RoomId) {
        let Some(room) = self.rooms.remove(room_id) else {
            return;
        };
        let Some(buckets) = self.namespaces.get_mut(&room.namespace) else {
            debug_assert!(false, "indexed room without namespace buckets");
            return;
        };

        for (field, key) in &room.predicate_refs {
            match field {
                Some(field) => {
                    if let Some(slot) = buckets.fields.get_mut(field) {
                        detach(slot, key, room_id);
                        if slot.is_empty() {
                            buckets.fields.remove(field);
                        }
                    }
                }
                None => detach(&mut buckets.unfielded, key, room_id),
            }
        }

        if buckets.is_empty() {
            self.namespaces.remove(&room.namespace);
        }
    }

    /// Whether a room is indexed
    pub fn contains_room(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// The filter AST of an indexed room
    pub fn room_filter(&self, room_id: &RoomId) -> Option<&Arc<FilterExpression>> {
        self.rooms.get(room_id).map(|r| &r.filter)
    }

    /// Predicates bucketed under a field in a namespace
    pub fn field_predicates<'a>(
        &'a self,
        namespace: &Namespace,
        field: &str,
    ) -> impl Iterator<Item = &'a PredicateEntry> + 'a {
        self.namespaces
            .get(namespace)
            .and_then(|b| b.fields.get(field))
            .into_iter()
            .flat_map(|m| m.values())
    }

    /// Namespace-wide predicates of a namespace
    pub fn unfielded_predicates<'a>(
        &'a self,
        namespace: &Namespace,
    ) -> impl Iterator<Item = &'a PredicateEntry> + 'a {
        self.namespaces
            .get(namespace)
            .into_iter()
            .flat_map(|b| b.unfielded.values())
    }

    /// Number of indexed rooms
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of live predicates in a namespace
    pub fn predicate_count(&self, namespace: &Namespace) -> usize {
        self.namespaces
            .get(namespace)
            .map(|b| {
                b.fields.values().map(HashMap::len).sum::<usize>() + b.unfielded.len()
            })
            .unwrap_or(0)
    }

    /// Whether the index holds no state at all
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty() && self.namespaces.is_empty()
    }
}

fn detach(
    slot: &mut HashMap<PredicateKey, PredicateEntry>,
    key: &PredicateKey,
    room_id: &RoomId,
) {
    if let Some(entry) = slot.get_mut(key) {
        entry.rooms.remove(room_id);
        if entry.rooms.is_empty() {
            slot.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::filter::compile;
    use serde_json::json;

    fn ns() -> Namespace {
        Namespace::new("idx", "users")
    }

    fn compiled(raw: serde_json::Value) -> CompiledFilter {
        compile(&ns(), &raw, &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_insert_and_remove_cascade() {
        let mut index = FilterIndex::new();
        let filter = compiled(json!({"term": {"city": "NYC"}}));

        index.insert_room(&filter);
        assert!(index.contains_room(&filter.room_id));
        assert_eq!(index.predicate_count(&ns()), 1);

        index.remove_room(&filter.room_id);
        assert!(!index.contains_room(&filter.room_id));
        assert_eq!(index.predicate_count(&ns()), 0);
        assert!(index.is_empty());
    }

    #[test]
    fn test_shared_predicate_survives_one_room_removal() {
        let mut index = FilterIndex::new();
        let a = compiled(json!({"and": [
            {"term": {"city": "NYC"}},
            {"exists": "email"}
        ]}));
        let b = compiled(json!({"term": {"city": "NYC"}}));

        index.insert_room(&a);
        index.insert_room(&b);
        // city predicate shared, email predicate only in room a
        assert_eq!(index.predicate_count(&ns()), 2);

        index.remove_room(&a.room_id);
        assert_eq!(index.predicate_count(&ns()), 1);
        assert!(index.contains_room(&b.room_id));

        index.remove_room(&b.room_id);
        assert!(index.is_empty());
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut index = FilterIndex::new();
        let filter = compiled(json!({"term": {"city": "NYC"}}));

        index.insert_room(&filter);
        index.insert_room(&filter);

        assert_eq!(index.room_count(), 1);
        assert_eq!(index.predicate_count(&ns()), 1);
    }

    #[test]
    fn test_unfielded_bucket() {
        let mut index = FilterIndex::new();
        let filter = compiled(json!({"missing": {"field": "tag"}}));

        index.insert_room(&filter);
        assert_eq!(index.unfielded_predicates(&ns()).count(), 1);
        assert_eq!(index.field_predicates(&ns(), "tag").count(), 0);
    }

    #[test]
    fn test_remove_unknown_room_is_noop() {
        let mut index = FilterIndex::new();
        index.remove_room(&"nope".to_string());
        assert!(index.is_empty());
    }
}
