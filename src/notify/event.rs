//! # Document Events and Notifications
//!
//! Input events from the document event source and the notification
//! payloads pushed to subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::types::{Namespace, RoomId};

/// Kind of document write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentAction {
    /// New document persisted
    Create,
    /// Existing document changed
    Update,
    /// Document removed
    Delete,
    /// Transient realtime message, never persisted
    Publish,
}

impl std::fmt::Display for DocumentAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentAction::Create => write!(f, "create"),
            DocumentAction::Update => write!(f, "update"),
            DocumentAction::Delete => write!(f, "delete"),
            DocumentAction::Publish => write!(f, "publish"),
        }
    }
}

/// Whether a document is entering or leaving a room's match set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Document enters (or stays in) scope
    In,
    /// Document leaves scope
    Out,
}

/// Whether the originating write is durably applied yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteState {
    /// Not yet durably applied
    Pending,
    /// Applied
    Done,
}

/// Direction of a user join/leave event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserDirection {
    /// A connection joined the room
    In,
    /// A connection left the room
    Out,
}

/// A document write emitted by the event source collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEvent {
    /// What happened
    pub action: DocumentAction,
    /// Where it happened
    pub namespace: Namespace,
    /// The document id
    pub document_id: String,
    /// Document body after the write (`null` for deletes)
    pub body: Value,
    /// Body before the write, present on updates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_body: Option<Value>,
}

impl DocumentEvent {
    /// A create event
    pub fn create(namespace: Namespace, document_id: impl Into<String>, body: Value) -> Self {
        Self {
            action: DocumentAction::Create,
            namespace,
            document_id: document_id.into(),
            body,
            previous_body: None,
        }
    }

    /// An update event carrying both bodies
    pub fn update(
        namespace: Namespace,
        document_id: impl Into<String>,
        previous_body: Value,
        body: Value,
    ) -> Self {
        Self {
            action: DocumentAction::Update,
            namespace,
            document_id: document_id.into(),
            body,
            previous_body: Some(previous_body),
        }
    }

    /// A delete event; `body` is the last known document body
    pub fn delete(namespace: Namespace, document_id: impl Into<String>, body: Value) -> Self {
        Self {
            action: DocumentAction::Delete,
            namespace,
            document_id: document_id.into(),
            body,
            previous_body: None,
        }
    }

    /// A transient publish event
    pub fn publish(namespace: Namespace, document_id: impl Into<String>, body: Value) -> Self {
        Self {
            action: DocumentAction::Publish,
            namespace,
            document_id: document_id.into(),
            body,
            previous_body: None,
        }
    }
}

/// Event metadata the channel resolver filters channels by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationContext {
    /// Scope transition of the event
    pub scope: Scope,
    /// Write state of the event
    pub state: WriteState,
    /// Set for user join/leave events
    pub user: Option<UserDirection>,
}

impl NotificationContext {
    /// Context of a document notification
    pub fn document(scope: Scope, state: WriteState) -> Self {
        Self {
            scope,
            state,
            user: None,
        }
    }

    /// Context of a user join/leave notification
    pub fn user(direction: UserDirection) -> Self {
        Self {
            scope: match direction {
                UserDirection::In => Scope::In,
                UserDirection::Out => Scope::Out,
            },
            state: WriteState::Done,
            user: Some(direction),
        }
    }
}

/// A document notification pushed to a room's channels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentNotification {
    /// Unique notification id
    pub id: Uuid,
    /// Originating write action
    pub action: DocumentAction,
    /// Scope transition for the receiving room
    pub scope: Scope,
    /// Write state
    pub state: WriteState,
    /// Namespace of the document
    pub namespace: Namespace,
    /// The matched room
    pub room_id: RoomId,
    /// The document id
    pub document_id: String,
    /// Document body; the pre-update projection for scope-out updates
    pub result: Value,
    /// When the notification was produced
    pub timestamp: DateTime<Utc>,
}

/// A user join/leave notification pushed to a room's channels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserNotification {
    /// Unique notification id
    pub id: Uuid,
    /// Join or leave
    pub direction: UserDirection,
    /// Namespace of the room
    pub namespace: Namespace,
    /// The room
    pub room_id: RoomId,
    /// Customer count after the change
    pub subscriber_count: usize,
    /// When the notification was produced
    pub timestamp: DateTime<Utc>,
}

/// Any notification the engine hands to the transport
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Notification {
    /// A document matched (or left) a room
    Document(DocumentNotification),
    /// A connection joined or left a room
    User(UserNotification),
}

impl Notification {
    /// Build a document notification
    pub fn document(
        event: &DocumentEvent,
        room_id: RoomId,
        scope: Scope,
        state: WriteState,
        result: Value,
    ) -> Self {
        Notification::Document(DocumentNotification {
            id: Uuid::new_v4(),
            action: event.action,
            scope,
            state,
            namespace: event.namespace.clone(),
            room_id,
            document_id: event.document_id.clone(),
            result,
            timestamp: Utc::now(),
        })
    }

    /// Build a user notification
    pub fn user(
        namespace: Namespace,
        room_id: RoomId,
        direction: UserDirection,
        subscriber_count: usize,
    ) -> Self {
        Notification::User(UserNotification {
            id: Uuid::new_v4(),
            direction,
            namespace,
            room_id,
            subscriber_count,
            timestamp: Utc::now(),
        })
    }

    /// The room this notification is about
    pub fn room_id(&self) -> &RoomId {
        match self {
            Notification::Document(n) => &n.room_id,
            Notification::User(n) => &n.room_id,
        }
    }

    /// Serialize to the wire format pushed to clients
    pub fn to_wire_format(&self) -> Value {
        match self {
            Notification::Document(n) => serde_json::json!({
                "type": "document",
                "action": n.action.to_string(),
                "scope": n.scope,
                "state": n.state,
                "index": n.namespace.index,
                "collection": n.namespace.collection,
                "room": n.room_id,
                "result": {
                    "_id": n.document_id,
                    "_source": n.result,
                },
                "timestamp": n.timestamp.to_rfc3339(),
            }),
            Notification::User(n) => serde_json::json!({
                "type": "user",
                "user": n.direction,
                "index": n.namespace.index,
                "collection": n.namespace.collection,
                "room": n.room_id,
                "result": {
                    "count": n.subscriber_count,
                },
                "timestamp": n.timestamp.to_rfc3339(),
            }),
        }
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
    fn test_action_display() {
        assert_eq!(DocumentAction::Create.to_string(), "create");
        assert_eq!(DocumentAction::Publish.to_string(), "publish");
    }

    #[test]
    fn test_update_event_carries_both_bodies() {
        let event = DocumentEvent::update(
            ns(),
            "doc-1",
            json!({"city": "NYC"}),
            json!({"city": "LA"}),
        );
        assert_eq!(event.body, json!({"city": "LA"}));
        assert_eq!(event.previous_body, Some(json!({"city": "NYC"})));
    }

    #[test]
    fn test_document_wire_format() {
        let event = DocumentEvent::create(ns(), "doc-1", json!({"city": "NYC"}));
        let notification = Notification::document(
            &event,
            "room-1".to_string(),
            Scope::In,
            WriteState::Done,
            event.body.clone(),
        );

        let wire = notification.to_wire_format();
        assert_eq!(wire["type"], "document");
        assert_eq!(wire["action"], "create");
        assert_eq!(wire["scope"], "in");
        assert_eq!(wire["result"]["_id"], "doc-1");
        assert_eq!(wire["result"]["_source"]["city"], "NYC");
    }

    #[test]
    fn test_user_wire_format() {
        let notification =
            Notification::user(ns(), "room-1".to_string(), UserDirection::In, 3);

        let wire = notification.to_wire_format();
        assert_eq!(wire["type"], "user");
        assert_eq!(wire["user"], "in");
        assert_eq!(wire["result"]["count"], 3);
    }

    #[test]
    fn test_user_context_scope_follows_direction() {
        let ctx = NotificationContext::user(UserDirection::Out);
        assert_eq!(ctx.scope, Scope::Out);
        assert_eq!(ctx.user, Some(UserDirection::Out));
    }
}
