//! # Core Identifiers
//!
//! Shared identifier types and the document view used across the engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a room (one unique compiled filter within a namespace).
///
/// Room ids are deterministic: the hex Sha256 of the namespace plus the
/// canonical form of the filter, so identical filters from different
/// connections collapse to the same room.
pub type RoomId = String;

/// Identifier of a channel (one filtered view of a room's match events).
pub type ChannelId = String;

/// Identifier of a client connection.
pub type ConnectionId = String;

/// An (index, collection) pair scoping filters and documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace {
    /// Index name
    pub index: String,
    /// Collection name
    pub collection: String,
}

impl Namespace {
    /// Create a namespace from an index and collection name
    pub fn new(index: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            collection: collection.into(),
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.index, self.collection)
    }
}

/// Borrowed view of a document being matched.
///
/// The engine never owns documents; storage is an external collaborator.
#[derive(Debug, Clone, Copy)]
pub struct Document<'a> {
    /// Document id (addressable in filters as `_id`)
    pub id: &'a str,
    /// Document body
    pub body: &'a Value,
}

impl<'a> Document<'a> {
    /// Create a document view
    pub fn new(id: &'a str, body: &'a Value) -> Self {
        Self { id, body }
    }

    /// Resolve a dot-separated field path against the body.
    ///
    /// Explicit `null` values count as absent, so `exists` and `missing`
    /// treat `{"a": null}` the same as a document without `a`.
    pub fn field(&self, path: &str) -> Option<&'a Value> {
        let mut current = self.body;
        for segment in path.split('.') {
            current = current.as_object()?.get(segment)?;
        }
        if current.is_null() {
            None
        } else {
            Some(current)
        }
    }
}
