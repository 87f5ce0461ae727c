//! # Rooms and Channels
//!
//! A room represents one unique compiled filter within a namespace. Each
//! room exposes one or more channels, each a differently-filtered view of
//! the same match events (scope, state, user notifications).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::filter::FilterExpression;
use crate::types::{ChannelId, ConnectionId, Namespace, RoomId};

/// Which scope transitions a channel wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeFilter {
    /// Both entering and leaving documents
    #[default]
    All,
    /// Only documents entering the room's scope
    In,
    /// Only documents leaving the room's scope
    Out,
    /// No document notifications
    None,
}

/// Which write states a channel wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateFilter {
    /// Both pending and applied writes
    #[default]
    All,
    /// Only writes not yet durably applied
    Pending,
    /// Only applied writes
    Done,
}

/// Which user join/leave events a channel wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsersFilter {
    /// Both joins and leaves
    All,
    /// Only joins
    In,
    /// Only leaves
    Out,
    /// No user notifications
    #[default]
    None,
}

/// Per-channel notification options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelOptions {
    /// Scope transitions to receive
    #[serde(default)]
    pub scope: ScopeFilter,
    /// Write states to receive
    #[serde(default)]
    pub state: StateFilter,
    /// User events to receive
    #[serde(default)]
    pub users: UsersFilter,
}

impl ChannelOptions {
    /// Derive the channel id for these options on a room.
    ///
    /// The id is the room id plus a short options hash, so every distinct
    /// filtered view of a room gets its own wire channel.
    pub fn channel_id(&self, room_id: &RoomId) -> ChannelId {
        let mut hasher = Sha256::new();
        hasher.update([
            self.scope as u8,
            0,
            self.state as u8,
            0,
            self.users as u8,
        ]);
        let digest = hasher.finalize();
        let mut suffix = String::with_capacity(16);
        for b in &digest[..8] {
            suffix.push_str(&format!("{b:02x}"));
        }
        format!("{room_id}-{suffix}")
    }
}

/// One wire channel of a room
#[derive(Debug, Clone)]
pub struct Channel {
    /// The view options this channel was created with
    pub options: ChannelOptions,
    /// Connections listening on this channel
    pub connections: HashSet<ConnectionId>,
}

impl Channel {
    /// Create an empty channel
    pub fn new(options: ChannelOptions) -> Self {
        Self {
            options,
            connections: HashSet::new(),
        }
    }
}

/// One unique (namespace, compiled filter) pair and its subscribers.
///
/// A live room always has at least one customer; the registry deletes the
/// room when the last one leaves.
#[derive(Debug, Clone)]
pub struct Room {
    /// Deterministic room id
    pub id: RoomId,
    /// Namespace the filter is scoped to
    pub namespace: Namespace,
    /// The compiled filter AST
    pub filter: Arc<FilterExpression>,
    /// Channels keyed by channel id
    pub channels: HashMap<ChannelId, Channel>,
    /// Connections subscribed to the room
    pub customers: HashSet<ConnectionId>,
}

impl Room {
    /// Create a room with no channels or customers yet
    pub fn new(id: RoomId, namespace: Namespace, filter: Arc<FilterExpression>) -> Self {
        Self {
            id,
            namespace,
            filter,
            channels: HashMap::new(),
            customers: HashSet::new(),
        }
    }
}
