//! # Subscription Store
//!
//! Room and customer bookkeeping. The store is a plain data structure; the
//! engine serializes every structural mutation against concurrent matching
//! through its own lock.

use std::collections::{HashMap, HashSet};

use super::errors::{RegistryError, RegistryResult};
use super::room::{Channel, ChannelOptions, Room};
use crate::filter::CompiledFilter;
use crate::matching::FilterIndex;
use crate::types::{ChannelId, ConnectionId, Namespace, RoomId};

/// Outcome of a successful subscribe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscribed {
    /// The room joined (possibly shared with other connections)
    pub room_id: RoomId,
    /// The wire channel derived from the subscription options
    pub channel_id: ChannelId,
    /// Whether this subscribe created the room
    pub room_created: bool,
}

/// Outcome of a successful unsubscribe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unsubscribed {
    /// The room left
    pub room_id: RoomId,
    /// Channels the connection was detached from; the caller must sever
    /// transport membership on these or delivery outlives the subscription
    pub channel_ids: Vec<ChannelId>,
    /// Whether the room was deleted because its last customer left
    pub room_removed: bool,
}

/// Rooms and customers of the engine
#[derive(Debug, Default)]
pub struct SubscriptionStore {
    rooms: HashMap<RoomId, Room>,
    /// Per-connection: joined rooms and the channels joined on each
    customers: HashMap<ConnectionId, HashMap<RoomId, HashSet<ChannelId>>>,
}

impl SubscriptionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a connection to the room of a compiled filter, creating room
    /// and channel on first use.
    ///
    /// Fails with `AlreadySubscribed` when the identical (connection, room,
    /// channel options) tuple exists, and with `TooManyRooms` when the
    /// connection would exceed its room limit.
    pub fn subscribe(
        &mut self,
        connection_id: &str,
        compiled: &CompiledFilter,
        options: ChannelOptions,
        index: &mut FilterIndex,
        max_rooms: usize,
    ) -> RegistryResult<Subscribed> {
        let room_id = compiled.room_id.clone();
        let channel_id = options.channel_id(&room_id);

        let joined_rooms = self.customers.get(connection_id);
        if let Some(channels) = joined_rooms.and_then(|rooms| rooms.get(&room_id)) {
            if channels.contains(&channel_id) {
                return Err(RegistryError::AlreadySubscribed {
                    connection: connection_id.to_string(),
                    room: room_id,
                });
            }
        } else if joined_rooms.map(HashMap::len).unwrap_or(0) >= max_rooms {
            return Err(RegistryError::TooManyRooms(max_rooms));
        }

        let room_created = !self.rooms.contains_key(&room_id);
        if room_created {
            index.insert_room(compiled);
            self.rooms.insert(
                room_id.clone(),
                Room::new(
                    room_id.clone(),
                    compiled.namespace.clone(),
                    compiled.filter.clone(),
                ),
            );
        }

        let room = self.rooms.get_mut(&room_id).expect("room just ensured");
        room.customers.insert(connection_id.to_string());
        room.channels
            .entry(channel_id.clone())
            .or_insert_with(|| Channel::new(options))
            .connections
            .insert(connection_id.to_string());

        self.customers
            .entry(connection_id.to_string())
            .or_default()
            .entry(room_id.clone())
            .or_default()
            .insert(channel_id.clone());

        Ok(Subscribed {
            room_id,
            channel_id,
            room_created,
        })
    }

    /// Detach a connection from a room (all its channels on that room).
    ///
    /// Deletes the room and its predicate references when the last customer
    /// leaves.
    pub fn unsubscribe(
        &mut self,
        connection_id: &str,
        room_id: &RoomId,
        index: &mut FilterIndex,
    ) -> RegistryResult<Unsubscribed> {
        {
            let room = self
                .rooms
                .get(room_id)
                .ok_or_else(|| RegistryError::RoomNotFound(room_id.clone()))?;
            if !room.customers.contains(connection_id) {
                return Err(RegistryError::NotSubscribed {
                    connection: connection_id.to_string(),
                    room: room_id.clone(),
                });
            }
        }

        let channel_ids = self
            .customers
            .get_mut(connection_id)
            .and_then(|rooms| rooms.remove(room_id))
            .unwrap_or_default();
        if self
            .customers
            .get(connection_id)
            .is_some_and(|rooms| rooms.is_empty())
        {
            self.customers.remove(connection_id);
        }

        let room = self.rooms.get_mut(room_id).expect("existence checked above");
        for channel_id in &channel_ids {
            if let Some(channel) = room.channels.get_mut(channel_id) {
                channel.connections.remove(connection_id);
                if channel.connections.is_empty() {
                    room.channels.remove(channel_id);
                }
            }
        }

        room.customers.remove(connection_id);
        let room_removed = room.customers.is_empty();
        if room_removed {
            self.rooms.remove(room_id);
            index.remove_room(room_id);
        }

        Ok(Unsubscribed {
            room_id: room_id.clone(),
            channel_ids: channel_ids.into_iter().collect(),
            room_removed,
        })
    }

    /// Detach a connection from every room it belongs to.
    ///
    /// Disconnect and token-expiry eviction both land here. Returns the
    /// rooms that were left.
    pub fn remove_connection(
        &mut self,
        connection_id: &str,
        index: &mut FilterIndex,
    ) -> Vec<Unsubscribed> {
        let room_ids: Vec<RoomId> = self
            .customers
            .get(connection_id)
            .map(|rooms| rooms.keys().cloned().collect())
            .unwrap_or_default();

        let mut left = Vec::with_capacity(room_ids.len());
        for room_id in room_ids {
            match self.unsubscribe(connection_id, &room_id, index) {
                Ok(unsubscribed) => left.push(unsubscribed),
                Err(_) => debug_assert!(false, "customer map out of sync with rooms"),
            }
        }
        left
    }

    /// Number of customers in a room
    pub fn count_subscribers(&self, room_id: &RoomId) -> RegistryResult<usize> {
        self.rooms
            .get(room_id)
            .map(|room| room.customers.len())
            .ok_or_else(|| RegistryError::RoomNotFound(room_id.clone()))
    }

    /// Per-namespace room subscriber counts, restricted to namespaces the
    /// caller-supplied predicate admits.
    pub fn list_subscriptions<F>(&self, allow: F) -> HashMap<Namespace, HashMap<RoomId, usize>>
    where
        F: Fn(&Namespace) -> bool,
    {
        let mut listing: HashMap<Namespace, HashMap<RoomId, usize>> = HashMap::new();
        for room in self.rooms.values() {
            if !allow(&room.namespace) {
                continue;
            }
            listing
                .entry(room.namespace.clone())
                .or_default()
                .insert(room.id.clone(), room.customers.len());
        }
        listing
    }

    /// Look up a room
    pub fn room(&self, room_id: &RoomId) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    /// Number of live rooms
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Rooms a connection belongs to
    pub fn rooms_of(&self, connection_id: &str) -> Vec<RoomId> {
        self.customers
            .get(connection_id)
            .map(|rooms| rooms.keys().cloned().collect())
            .unwrap_or_default()
    }
}
