//! # Notifier
//!
//! Orchestrates a document write into channel deliveries: match the
//! document, diff against the per-document match cache to detect scope
//! transitions, resolve channels, and hand off to the transport.
//!
//! Planning runs under the engine lock and is pure computation; delivery
//! happens after the lock is released. A transport failure is logged per
//! room and never aborts the remaining fan-out.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use super::event::{
    DocumentAction, DocumentEvent, Notification, NotificationContext, Scope, UserDirection,
    WriteState,
};
use super::resolver::resolve_channels;
use super::transport::Transport;
use crate::matching::{match_document, FilterIndex};
use crate::observability::{Logger, MetricsRegistry};
use crate::registry::SubscriptionStore;
use crate::types::{ChannelId, Document, Namespace, RoomId};

/// One planned hand-off to the transport
#[derive(Debug, Clone)]
pub struct Outbound {
    /// The room being notified
    pub room_id: RoomId,
    /// The resolved wire channels
    pub channels: Vec<ChannelId>,
    /// The payload
    pub notification: Notification,
}

/// Planned fan-out for one event.
///
/// `matched` is counted before channel resolution: a room whose channels
/// all filter the event out still matched it.
#[derive(Debug, Default)]
pub struct Plan {
    /// Rooms the event matched (or left)
    pub matched: usize,
    /// Hand-offs to the transport
    pub outbound: Vec<Outbound>,
}

/// Result of one notification fan-out
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NotifyReport {
    /// Rooms the event matched (or left)
    pub matched: usize,
    /// Hand-offs the transport accepted
    pub delivered: usize,
    /// Hand-offs the transport rejected
    pub failed: usize,
}

/// Document-to-channel notification orchestrator
#[derive(Debug)]
pub struct Notifier {
    transport: Arc<dyn Transport>,
    metrics: Arc<MetricsRegistry>,
    /// Per-document rooms matched at the last evaluation
    cache: RwLock<HashMap<(Namespace, String), HashSet<RoomId>>>,
}

impl Notifier {
    /// Create a notifier delivering through the given transport
    pub fn new(transport: Arc<dyn Transport>, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            transport,
            metrics,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Plan the fan-out for a document event.
    ///
    /// Mutates only the match cache; callers must hold the engine lock so
    /// the index and store are consistent.
    pub fn plan(
        &self,
        index: &FilterIndex,
        store: &SubscriptionStore,
        event: &DocumentEvent,
    ) -> Plan {
        let doc = Document::new(&event.document_id, &event.body);
        let cache_key = (event.namespace.clone(), event.document_id.clone());

        let mut matched_rooms = 0;
        let mut outbound = Vec::new();
        match event.action {
            DocumentAction::Create | DocumentAction::Publish => {
                let matched = match_document(index, &event.namespace, &doc);
                matched_rooms = matched.len();
                let state = match event.action {
                    DocumentAction::Publish => WriteState::Pending,
                    _ => WriteState::Done,
                };
                let ctx = NotificationContext::document(Scope::In, state);
                for room_id in &matched {
                    self.push_document(
                        store,
                        event,
                        room_id,
                        &ctx,
                        event.body.clone(),
                        &mut outbound,
                    );
                }
                // Transient publishes leave no trace in the cache
                if event.action == DocumentAction::Create {
                    self.cache_put(cache_key, matched);
                }
            }
            DocumentAction::Update => {
                let new_matches = match_document(index, &event.namespace, &doc);
                let old_matches = self.cache_get(&cache_key);
                matched_rooms =
                    new_matches.len() + old_matches.difference(&new_matches).count();

                let in_ctx = NotificationContext::document(Scope::In, WriteState::Done);
                let out_ctx = NotificationContext::document(Scope::Out, WriteState::Done);
                // Leaving rooms get the pre-update projection so recipients
                // can identify what they are losing
                let leaving_body = event
                    .previous_body
                    .clone()
                    .unwrap_or_else(|| event.body.clone());

                for room_id in &new_matches {
                    self.push_document(
                        store,
                        event,
                        room_id,
                        &in_ctx,
                        event.body.clone(),
                        &mut outbound,
                    );
                }
                for room_id in old_matches.difference(&new_matches) {
                    self.push_document(
                        store,
                        event,
                        room_id,
                        &out_ctx,
                        leaving_body.clone(),
                        &mut outbound,
                    );
                }

                self.cache_put(cache_key, new_matches);
            }
            DocumentAction::Delete => {
                let matched = self.cache_remove(&cache_key);
                matched_rooms = matched.len();
                let ctx = NotificationContext::document(Scope::Out, WriteState::Done);
                for room_id in &matched {
                    self.push_document(
                        store,
                        event,
                        room_id,
                        &ctx,
                        event.body.clone(),
                        &mut outbound,
                    );
                }
            }
        }

        self.metrics.increment_events_processed();
        self.metrics.add_rooms_matched(matched_rooms as u64);
        Plan {
            matched: matched_rooms,
            outbound,
        }
    }

    /// Plan the user join/leave notification for a room, if any channel
    /// wants it.
    pub fn plan_user_event(
        &self,
        store: &SubscriptionStore,
        room_id: &RoomId,
        direction: UserDirection,
    ) -> Vec<Outbound> {
        let Some(room) = store.room(room_id) else {
            // Room already gone (last customer left); nobody to notify
            return Vec::new();
        };

        let ctx = NotificationContext::user(direction);
        let channels = resolve_channels(room, &ctx);
        if channels.is_empty() {
            return Vec::new();
        }

        let notification = Notification::user(
            room.namespace.clone(),
            room_id.clone(),
            direction,
            room.customers.len(),
        );
        vec![Outbound {
            room_id: room_id.clone(),
            channels,
            notification,
        }]
    }

    /// Hand planned notifications to the transport.
    ///
    /// Call without holding any engine lock; the transport may touch the
    /// network.
    pub fn dispatch(&self, plan: Plan) -> NotifyReport {
        let mut report = NotifyReport {
            matched: plan.matched,
            ..NotifyReport::default()
        };

        for item in plan.outbound {
            match self
                .transport
                .deliver(&item.channels, None, &item.notification)
            {
                Ok(()) => {
                    report.delivered += 1;
                    self.metrics.increment_notifications_delivered();
                }
                Err(err) => {
                    report.failed += 1;
                    self.metrics.increment_notifications_failed();
                    Logger::error(
                        "NOTIFY_FAILED",
                        &[("room", &item.room_id), ("error", &err.to_string())],
                    );
                }
            }
        }

        report
    }

    /// Rooms cached as matching a document (test and introspection hook)
    pub fn cached_rooms(&self, namespace: &Namespace, document_id: &str) -> HashSet<RoomId> {
        self.cache
            .read()
            .ok()
            .and_then(|cache| {
                cache
                    .get(&(namespace.clone(), document_id.to_string()))
                    .cloned()
            })
            .unwrap_or_default()
    }

    fn push_document(
        &self,
        store: &SubscriptionStore,
        event: &DocumentEvent,
        room_id: &RoomId,
        ctx: &NotificationContext,
        result: serde_json::Value,
        outbound: &mut Vec<Outbound>,
    ) {
        // Cached rooms may have been deleted since the last evaluation
        let Some(room) = store.room(room_id) else {
            return;
        };
        let channels = resolve_channels(room, ctx);
        if channels.is_empty() {
            return;
        }
        outbound.push(Outbound {
            room_id: room_id.clone(),
            channels,
            notification: Notification::document(
                event,
                room_id.clone(),
                ctx.scope,
                ctx.state,
                result,
            ),
        });
    }

    fn cache_get(&self, key: &(Namespace, String)) -> HashSet<RoomId> {
        self.cache
            .read()
            .ok()
            .and_then(|cache| cache.get(key).cloned())
            .unwrap_or_default()
    }

    fn cache_put(&self, key: (Namespace, String), rooms: HashSet<RoomId>) {
        if let Ok(mut cache) = self.cache.write() {
            if rooms.is_empty() {
                cache.remove(&key);
            } else {
                cache.insert(key, rooms);
            }
        }
    }

    fn cache_remove(&self, key: &(Namespace, String)) -> HashSet<RoomId> {
        self.cache
            .write()
            .ok()
            .and_then(|mut cache| cache.remove(key))
            .unwrap_or_default()
    }
}
