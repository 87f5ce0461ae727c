//! # Transport Seam
//!
//! The delivery collaborator interface, plus an in-process implementation
//! backed by per-connection mpsc senders for embedded use and tests.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use tokio::sync::mpsc;

use super::errors::{DeliveryError, DeliveryResult};
use super::event::Notification;
use crate::types::{ChannelId, ConnectionId};

/// Receiving end of an in-process connection
pub type NotificationReceiver = mpsc::UnboundedReceiver<Notification>;

/// Delivery service consumed by the notifier.
///
/// With a `connection_id` delivery is unicast; without one it is a
/// broadcast to every subscriber of each channel. Implementations must not
/// block: the engine calls `deliver` outside its locks but on the event
/// path.
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Hand a notification to the wire
    fn deliver(
        &self,
        channels: &[ChannelId],
        connection_id: Option<&str>,
        notification: &Notification,
    ) -> DeliveryResult<()>;

    /// Sever a connection's membership of the given channels.
    ///
    /// Invoked when a subscription ends (unsubscribe, eviction) so that
    /// delivery stops with it even while the connection stays open. The
    /// default is a no-op for transports without per-channel membership.
    fn revoke(&self, _connection_id: &str, _channels: &[ChannelId]) {}
}

/// Transport that drops everything; useful when only match bookkeeping is
/// wanted.
#[derive(Debug, Default)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn deliver(
        &self,
        _channels: &[ChannelId],
        _connection_id: Option<&str>,
        _notification: &Notification,
    ) -> DeliveryResult<()> {
        Ok(())
    }
}

/// In-process channel multiplexer.
///
/// Connections register a sender, channels track their member connections,
/// and delivery is a non-blocking unbounded send per member.
#[derive(Debug, Default)]
pub struct LocalTransport {
    connections: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<Notification>>>,
    channels: RwLock<HashMap<ChannelId, HashSet<ConnectionId>>>,
}

impl LocalTransport {
    /// Create an empty multiplexer
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and get its notification stream
    pub fn connect(&self, connection_id: &str) -> NotificationReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut connections) = self.connections.write() {
            connections.insert(connection_id.to_string(), tx);
        }
        rx
    }

    /// Drop a connection and every channel membership it holds
    pub fn disconnect(&self, connection_id: &str) {
        if let Ok(mut connections) = self.connections.write() {
            connections.remove(connection_id);
        }
        if let Ok(mut channels) = self.channels.write() {
            channels.retain(|_, members| {
                members.remove(connection_id);
                !members.is_empty()
            });
        }
    }

    /// Attach a connection to a wire channel
    pub fn join(&self, channel_id: &str, connection_id: &str) {
        if let Ok(mut channels) = self.channels.write() {
            channels
                .entry(channel_id.to_string())
                .or_default()
                .insert(connection_id.to_string());
        }
    }

    /// Detach a connection from a wire channel
    pub fn leave(&self, channel_id: &str, connection_id: &str) {
        if let Ok(mut channels) = self.channels.write() {
            if let Some(members) = channels.get_mut(channel_id) {
                members.remove(connection_id);
                if members.is_empty() {
                    channels.remove(channel_id);
                }
            }
        }
    }

    /// Number of registered connections
    pub fn connection_count(&self) -> usize {
        self.connections.read().map(|c| c.len()).unwrap_or(0)
    }
}

impl Transport for LocalTransport {
    fn deliver(
        &self,
        channels: &[ChannelId],
        connection_id: Option<&str>,
        notification: &Notification,
    ) -> DeliveryResult<()> {
        let connections = self
            .connections
            .read()
            .map_err(|_| DeliveryError::Internal("lock poisoned".to_string()))?;

        if let Some(target) = connection_id {
            let sender = connections
                .get(target)
                .ok_or_else(|| DeliveryError::ConnectionGone(target.to_string()))?;
            return sender
                .send(notification.clone())
                .map_err(|_| DeliveryError::ConnectionGone(target.to_string()));
        }

        let memberships = self
            .channels
            .read()
            .map_err(|_| DeliveryError::Internal("lock poisoned".to_string()))?;

        let mut first_error = None;
        for channel_id in channels {
            let Some(members) = memberships.get(channel_id) else {
                continue;
            };
            for member in members {
                let delivered = connections
                    .get(member)
                    .map(|sender| sender.send(notification.clone()).is_ok())
                    .unwrap_or(false);
                if !delivered && first_error.is_none() {
                    first_error = Some(DeliveryError::ChannelClosed(channel_id.clone()));
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn revoke(&self, connection_id: &str, channels: &[ChannelId]) {
        for channel_id in channels {
            self.leave(channel_id, connection_id);
        }
    }
}
