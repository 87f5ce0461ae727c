//! # Realtime Engine
//!
//! Public facade tying the subsystems together: filter compilation,
//! the matching index, the subscription store, and the notifier.
//!
//! # Concurrency
//!
//! One `RwLock` guards the index and the store as a unit, so a document
//! event always observes a consistent subscription snapshot. Notifications
//! are planned under the lock and delivered after it is released; the
//! transport never runs inside the critical section.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::config::EngineConfig;
use crate::filter::compile;
use crate::matching::FilterIndex;
use crate::notify::{
    DocumentEvent, Notifier, NotifyReport, NullTransport, Plan, Transport, UserDirection,
};
use crate::observability::{Logger, MetricsRegistry, MetricsSnapshot};
use crate::registry::{
    ChannelOptions, RegistryError, RegistryResult, Subscribed, SubscriptionStore, Unsubscribed,
};
use crate::types::{ChannelId, Namespace, RoomId};

/// Decides which namespaces a connection may introspect.
///
/// Subscription listing is the only engine surface that exposes other
/// connections' state, so it is the only one that consults this.
pub trait Authorization: Send + Sync + std::fmt::Debug {
    /// Whether the connection may see rooms of this namespace
    fn can_list(&self, connection_id: &str, namespace: &Namespace) -> bool;
}

/// Authorization that admits everything
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl Authorization for AllowAll {
    fn can_list(&self, _connection_id: &str, _namespace: &Namespace) -> bool {
        true
    }
}

#[derive(Debug, Default)]
struct EngineState {
    index: FilterIndex,
    store: SubscriptionStore,
}

/// The content-based subscription engine
#[derive(Debug)]
pub struct RealtimeEngine {
    state: RwLock<EngineState>,
    notifier: Notifier,
    transport: Arc<dyn Transport>,
    authz: Arc<dyn Authorization>,
    config: EngineConfig,
    metrics: Arc<MetricsRegistry>,
}

impl RealtimeEngine {
    /// Create an engine delivering through the given transport
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let metrics = Arc::new(MetricsRegistry::new());
        Self {
            state: RwLock::new(EngineState::default()),
            notifier: Notifier::new(transport.clone(), metrics.clone()),
            transport,
            authz: Arc::new(AllowAll),
            config: EngineConfig::default(),
            metrics,
        }
    }

    /// Create an engine that discards every notification (tests, tooling)
    pub fn without_transport() -> Self {
        Self::new(Arc::new(NullTransport))
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the authorization policy
    pub fn with_authorization(mut self, authz: Arc<dyn Authorization>) -> Self {
        self.authz = authz;
        self
    }

    /// Subscribe a connection to a raw filter over a namespace.
    ///
    /// Identical filters collapse to one shared room; the returned channel
    /// id is what the caller should route deliveries by. Other subscribers
    /// of the room receive a user-join notification.
    pub fn subscribe(
        &self,
        connection_id: &str,
        namespace: &Namespace,
        raw_filter: &Value,
        options: ChannelOptions,
    ) -> RegistryResult<Subscribed> {
        let compiled = compile(namespace, raw_filter, &self.config)?;

        let (subscribed, outbound) = {
            let mut guard = self.lock_write()?;
            let state = &mut *guard;
            let subscribed = state.store.subscribe(
                connection_id,
                &compiled,
                options,
                &mut state.index,
                self.config.max_rooms_per_connection,
            )?;

            self.metrics.increment_subscriptions_created();
            if subscribed.room_created {
                self.metrics.increment_rooms_created();
                Logger::info(
                    "ROOM_CREATED",
                    &[
                        ("namespace", &namespace.to_string()),
                        ("room", &subscribed.room_id),
                    ],
                );
            }
            Logger::info(
                "SUBSCRIBED",
                &[
                    ("connection", connection_id),
                    ("room", &subscribed.room_id),
                ],
            );

            let outbound = self.notifier.plan_user_event(
                &state.store,
                &subscribed.room_id,
                UserDirection::In,
            );
            (subscribed, outbound)
        };

        self.notifier.dispatch(Plan {
            matched: outbound.len(),
            outbound,
        });
        Ok(subscribed)
    }

    /// Unsubscribe a connection from a room.
    ///
    /// The connection's transport membership of the detached channels is
    /// revoked before returning. When the room survives, its remaining
    /// subscribers receive a user-leave notification.
    pub fn unsubscribe(
        &self,
        connection_id: &str,
        room_id: &RoomId,
    ) -> RegistryResult<Unsubscribed> {
        let (unsubscribed, outbound) = {
            let mut guard = self.lock_write()?;
            let state = &mut *guard;
            let unsubscribed = state
                .store
                .unsubscribe(connection_id, room_id, &mut state.index)?;

            self.metrics.increment_subscriptions_removed();
            if unsubscribed.room_removed {
                self.metrics.increment_rooms_destroyed();
                Logger::info("ROOM_DESTROYED", &[("room", room_id)]);
            }
            Logger::info(
                "UNSUBSCRIBED",
                &[("connection", connection_id), ("room", room_id)],
            );

            let outbound = if unsubscribed.room_removed {
                Vec::new()
            } else {
                self.notifier
                    .plan_user_event(&state.store, room_id, UserDirection::Out)
            };
            (unsubscribed, outbound)
        };

        self.transport
            .revoke(connection_id, &unsubscribed.channel_ids);
        self.notifier.dispatch(Plan {
            matched: outbound.len(),
            outbound,
        });
        Ok(unsubscribed)
    }

    /// Remove a connection from every room it belongs to.
    ///
    /// Disconnects and credential expiry both land here. The connection's
    /// transport membership of every detached channel is revoked before
    /// returning, so no later event reaches it. Returns the rooms that were
    /// left.
    pub fn remove_connection(
        &self,
        connection_id: &str,
    ) -> RegistryResult<Vec<Unsubscribed>> {
        let (left, outbound) = {
            let mut guard = self.lock_write()?;
            let state = &mut *guard;
            let left = state.store.remove_connection(connection_id, &mut state.index);
            if left.is_empty() {
                return Ok(Vec::new());
            }

            self.metrics.increment_connections_evicted();
            for _ in &left {
                self.metrics.increment_subscriptions_removed();
            }
            Logger::info(
                "CONNECTION_REMOVED",
                &[
                    ("connection", connection_id),
                    ("rooms", &left.len().to_string()),
                ],
            );

            let mut outbound = Vec::new();
            for unsubscribed in &left {
                if unsubscribed.room_removed {
                    self.metrics.increment_rooms_destroyed();
                } else {
                    outbound.extend(self.notifier.plan_user_event(
                        &state.store,
                        &unsubscribed.room_id,
                        UserDirection::Out,
                    ));
                }
            }
            (left, outbound)
        };

        let channels: Vec<ChannelId> = left
            .iter()
            .flat_map(|unsubscribed| unsubscribed.channel_ids.iter().cloned())
            .collect();
        self.transport.revoke(connection_id, &channels);
        self.notifier.dispatch(Plan {
            matched: outbound.len(),
            outbound,
        });
        Ok(left)
    }

    /// Process a document event: match it, diff scope transitions, and
    /// fan notifications out to the resolved channels.
    pub fn on_document_event(&self, event: &DocumentEvent) -> RegistryResult<NotifyReport> {
        let plan = {
            let state = self.lock_read()?;
            self.notifier.plan(&state.index, &state.store, event)
        };
        Ok(self.notifier.dispatch(plan))
    }

    /// Number of customers in a room
    pub fn count_subscribers(&self, room_id: &RoomId) -> RegistryResult<usize> {
        self.lock_read()?.store.count_subscribers(room_id)
    }

    /// Per-namespace room subscriber counts visible to this connection
    pub fn list_subscriptions(
        &self,
        connection_id: &str,
    ) -> RegistryResult<HashMap<Namespace, HashMap<RoomId, usize>>> {
        let state = self.lock_read()?;
        Ok(state
            .store
            .list_subscriptions(|ns| self.authz.can_list(connection_id, ns)))
    }

    /// Number of live rooms
    pub fn room_count(&self) -> usize {
        self.state.read().map(|state| state.store.room_count()).unwrap_or(0)
    }

    /// Point-in-time metrics snapshot
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn lock_read(&self) -> RegistryResult<std::sync::RwLockReadGuard<'_, EngineState>> {
        self.state
            .read()
            .map_err(|_| RegistryError::Internal("engine state lock poisoned".to_string()))
    }

    fn lock_write(&self) -> RegistryResult<std::sync::RwLockWriteGuard<'_, EngineState>> {
        self.state
            .write()
            .map_err(|_| RegistryError::Internal("engine state lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ns() -> Namespace {
        Namespace::new("idx", "users")
    }

    #[test]
    fn test_subscribe_and_match() {
        let engine = RealtimeEngine::without_transport();
        let sub = engine
            .subscribe(
                "conn-1",
                &ns(),
                &json!({"term": {"city": "NYC"}}),
                ChannelOptions::default(),
            )
            .unwrap();

        let report = engine
            .on_document_event(&DocumentEvent::create(
                ns(),
                "doc-1",
                json!({"city": "NYC"}),
            ))
            .unwrap();
        assert_eq!(report.matched, 1);
        assert_eq!(report.delivered, 1);
        assert!(sub.room_created);
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let engine = RealtimeEngine::without_transport();
        let err = engine
            .subscribe(
                "conn-1",
                &ns(),
                &json!({"foobar": {"field": "x"}}),
                ChannelOptions::default(),
            )
            .unwrap_err();

        assert!(matches!(err, RegistryError::InvalidFilter(_)));
        assert!(err.to_string().contains("foobar"));
        assert_eq!(engine.room_count(), 0);
    }

    #[test]
    fn test_unsubscribe_stops_matching() {
        let engine = RealtimeEngine::without_transport();
        let sub = engine
            .subscribe(
                "conn-1",
                &ns(),
                &json!({"term": {"city": "NYC"}}),
                ChannelOptions::default(),
            )
            .unwrap();

        let out = engine.unsubscribe("conn-1", &sub.room_id).unwrap();
        assert!(out.room_removed);

        let report = engine
            .on_document_event(&DocumentEvent::create(
                ns(),
                "doc-1",
                json!({"city": "NYC"}),
            ))
            .unwrap();
        assert_eq!(report.matched, 0);
    }

    #[test]
    fn test_remove_connection_keeps_shared_rooms() {
        let engine = RealtimeEngine::without_transport();
        let filter = json!({"term": {"city": "NYC"}});
        engine
            .subscribe("conn-1", &ns(), &filter, ChannelOptions::default())
            .unwrap();
        let sub = engine
            .subscribe("conn-2", &ns(), &filter, ChannelOptions::default())
            .unwrap();

        let left = engine.remove_connection("conn-1").unwrap();
        assert_eq!(left.len(), 1);
        assert!(!left[0].room_removed);
        assert_eq!(engine.count_subscribers(&sub.room_id).unwrap(), 1);
    }

    #[test]
    fn test_update_emits_scope_transition() {
        let engine = RealtimeEngine::without_transport();
        engine
            .subscribe(
                "conn-1",
                &ns(),
                &json!({"term": {"city": "NYC"}}),
                ChannelOptions {
                    scope: crate::registry::ScopeFilter::All,
                    ..ChannelOptions::default()
                },
            )
            .unwrap();

        engine
            .on_document_event(&DocumentEvent::create(
                ns(),
                "doc-1",
                json!({"city": "NYC"}),
            ))
            .unwrap();
        let report = engine
            .on_document_event(&DocumentEvent::update(
                ns(),
                "doc-1",
                json!({"city": "NYC"}),
                json!({"city": "LA"}),
            ))
            .unwrap();

        // The document left the only room: one scope-out notification
        assert_eq!(report.matched, 1);
        assert_eq!(report.delivered, 1);
    }

    #[test]
    fn test_list_subscriptions_honors_authorization() {
        #[derive(Debug)]
        struct UsersOnly;
        impl Authorization for UsersOnly {
            fn can_list(&self, _connection_id: &str, namespace: &Namespace) -> bool {
                namespace.collection == "users"
            }
        }

        let engine =
            RealtimeEngine::without_transport().with_authorization(Arc::new(UsersOnly));
        engine
            .subscribe(
                "conn-1",
                &ns(),
                &json!({"term": {"city": "NYC"}}),
                ChannelOptions::default(),
            )
            .unwrap();
        engine
            .subscribe(
                "conn-1",
                &Namespace::new("idx", "posts"),
                &json!({"exists": "title"}),
                ChannelOptions::default(),
            )
            .unwrap();

        let listing = engine.list_subscriptions("conn-1").unwrap();
        assert_eq!(listing.len(), 1);
        assert!(listing.contains_key(&ns()));
    }

    #[test]
    fn test_metrics_track_lifecycle() {
        let engine = RealtimeEngine::without_transport();
        let sub = engine
            .subscribe(
                "conn-1",
                &ns(),
                &json!({"term": {"city": "NYC"}}),
                ChannelOptions::default(),
            )
            .unwrap();
        engine.unsubscribe("conn-1", &sub.room_id).unwrap();

        let snapshot = engine.metrics();
        assert_eq!(snapshot.rooms_created, 1);
        assert_eq!(snapshot.rooms_destroyed, 1);
        assert_eq!(snapshot.subscriptions_created, 1);
        assert_eq!(snapshot.subscriptions_removed, 1);
    }
}
