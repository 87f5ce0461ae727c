//! # Registry Errors
//!
//! Subscription bookkeeping errors. All of them indicate a caller mistake
//! or a client-side race; none is retried.

use thiserror::Error;

use crate::filter::FilterError;
use crate::types::{ConnectionId, RoomId};

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Subscription registry errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// Filter failed to compile
    #[error("Invalid filter: {0}")]
    InvalidFilter(#[from] FilterError),

    /// Room id is unknown
    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),

    /// Connection is not a customer of the room
    #[error("Connection {connection} is not subscribed to room {room}")]
    NotSubscribed {
        /// The connection
        connection: ConnectionId,
        /// The room
        room: RoomId,
    },

    /// Identical (connection, filter, channel options) tuple already exists
    #[error("Connection {connection} is already subscribed to room {room}")]
    AlreadySubscribed {
        /// The connection
        connection: ConnectionId,
        /// The room
        room: RoomId,
    },

    /// Connection reached its room limit
    #[error("Too many rooms for one connection (max: {0})")]
    TooManyRooms(usize),

    /// Internal error (poisoned lock)
    #[error("Internal error: {0}")]
    Internal(String),
}
