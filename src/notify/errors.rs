//! # Delivery Errors
//!
//! Failures reported by the transport collaborator. They are logged and
//! isolated per room; a failed hand-off never aborts the remaining fan-out.

use thiserror::Error;

use crate::types::{ChannelId, ConnectionId};

/// Result type for transport delivery
pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// Transport delivery errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeliveryError {
    /// Unicast target is not connected
    #[error("Connection gone: {0}")]
    ConnectionGone(ConnectionId),

    /// A channel subscriber's receiving end was dropped
    #[error("Channel subscriber unreachable on {0}")]
    ChannelClosed(ChannelId),

    /// Internal error (poisoned lock)
    #[error("Internal error: {0}")]
    Internal(String),
}
