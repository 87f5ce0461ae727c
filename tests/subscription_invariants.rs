//! Subscription Lifecycle Invariant Tests
//!
//! - Semantically-equal filters collapse to one shared room
//! - Subscriber counts track joins and leaves exactly
//! - A room and its index entries disappear with its last customer
//! - Connection eviction cleans up everything the connection touched
//! - Subscription listing honors the authorization policy

use fluxfeed::{
    Authorization, ChannelOptions, Namespace, RealtimeEngine, ScopeFilter, StateFilter,
    UsersFilter,
};
use serde_json::json;
use std::sync::Arc;

// =============================================================================
// Helper Functions
// =============================================================================

fn users() -> Namespace {
    Namespace::new("idx", "users")
}

fn posts() -> Namespace {
    Namespace::new("idx", "posts")
}

fn engine() -> RealtimeEngine {
    RealtimeEngine::without_transport()
}

// =============================================================================
// Room Deduplication Tests
// =============================================================================

/// The same filter written in any key order lands in the same room.
#[test]
fn test_equivalent_filters_share_a_room() {
    let engine = engine();

    let a = engine
        .subscribe(
            "conn-1",
            &users(),
            &json!({"and": [
                {"term": {"city": "NYC"}},
                {"range": {"age": {"gte": 21}}}
            ]}),
            ChannelOptions::default(),
        )
        .unwrap();
    let b = engine
        .subscribe(
            "conn-2",
            &users(),
            &json!({"and": [
                {"range": {"age": {"gte": 21}}},
                {"term": {"city": "NYC"}}
            ]}),
            ChannelOptions::default(),
        )
        .unwrap();

    assert!(a.room_created);
    assert!(!b.room_created);
    assert_eq!(a.room_id, b.room_id);
    assert_eq!(engine.room_count(), 1);
    assert_eq!(engine.count_subscribers(&a.room_id).unwrap(), 2);
}

/// The same filter over another namespace is a different room.
#[test]
fn test_namespace_scopes_rooms() {
    let engine = engine();
    let filter = json!({"term": {"city": "NYC"}});

    let a = engine
        .subscribe("conn-1", &users(), &filter, ChannelOptions::default())
        .unwrap();
    let b = engine
        .subscribe("conn-1", &posts(), &filter, ChannelOptions::default())
        .unwrap();

    assert_ne!(a.room_id, b.room_id);
    assert_eq!(engine.room_count(), 2);
}

/// Different channel options on one room produce distinct channel ids.
#[test]
fn test_channel_ids_derive_from_options() {
    let engine = engine();
    let filter = json!({"term": {"city": "NYC"}});

    let a = engine
        .subscribe("conn-1", &users(), &filter, ChannelOptions::default())
        .unwrap();
    let b = engine
        .subscribe(
            "conn-1",
            &users(),
            &filter,
            ChannelOptions {
                scope: ScopeFilter::Out,
                state: StateFilter::Done,
                users: UsersFilter::All,
            },
        )
        .unwrap();

    assert_eq!(a.room_id, b.room_id);
    assert_ne!(a.channel_id, b.channel_id);
    assert!(a.channel_id.starts_with(&a.room_id));
}

// =============================================================================
// Cleanup Cascade Tests
// =============================================================================

/// The last unsubscribe deletes the room; the same document no longer
/// matches anything afterwards.
#[test]
fn test_last_customer_removes_the_room() {
    let engine = engine();
    let filter = json!({"term": {"city": "NYC"}});

    let sub = engine
        .subscribe("conn-1", &users(), &filter, ChannelOptions::default())
        .unwrap();
    engine
        .subscribe("conn-2", &users(), &filter, ChannelOptions::default())
        .unwrap();

    let first = engine.unsubscribe("conn-1", &sub.room_id).unwrap();
    assert!(!first.room_removed);
    assert_eq!(engine.count_subscribers(&sub.room_id).unwrap(), 1);

    let second = engine.unsubscribe("conn-2", &sub.room_id).unwrap();
    assert!(second.room_removed);
    assert_eq!(engine.room_count(), 0);

    let report = engine
        .on_document_event(&fluxfeed::DocumentEvent::create(
            users(),
            "doc-1",
            json!({"city": "NYC"}),
        ))
        .unwrap();
    assert_eq!(report.matched, 0);
}

/// Evicting a connection leaves shared rooms intact and deletes exclusive
/// ones.
#[test]
fn test_connection_eviction() {
    let engine = engine();
    let shared = json!({"term": {"city": "NYC"}});
    let exclusive = json!({"term": {"city": "LA"}});

    engine
        .subscribe("conn-1", &users(), &shared, ChannelOptions::default())
        .unwrap();
    engine
        .subscribe("conn-1", &users(), &exclusive, ChannelOptions::default())
        .unwrap();
    let kept = engine
        .subscribe("conn-2", &users(), &shared, ChannelOptions::default())
        .unwrap();

    let left = engine.remove_connection("conn-1").unwrap();
    assert_eq!(left.len(), 2);
    assert_eq!(engine.room_count(), 1);
    assert_eq!(engine.count_subscribers(&kept.room_id).unwrap(), 1);

    // Evicting an unknown connection is a quiet no-op
    assert!(engine.remove_connection("conn-9").unwrap().is_empty());
}

// =============================================================================
// Error Path Tests
// =============================================================================

/// Malformed filters never create state.
#[test]
fn test_invalid_filter_creates_nothing() {
    let engine = engine();

    let err = engine
        .subscribe(
            "conn-1",
            &users(),
            &json!({"foobar": {"field": "x"}}),
            ChannelOptions::default(),
        )
        .unwrap_err();

    assert!(err.to_string().contains("foobar"));
    assert_eq!(engine.room_count(), 0);
    assert!(engine.list_subscriptions("conn-1").unwrap().is_empty());
}

/// The identical (connection, filter, options) tuple cannot subscribe twice.
#[test]
fn test_duplicate_subscription_rejected() {
    let engine = engine();
    let filter = json!({"term": {"city": "NYC"}});

    engine
        .subscribe("conn-1", &users(), &filter, ChannelOptions::default())
        .unwrap();
    let err = engine
        .subscribe("conn-1", &users(), &filter, ChannelOptions::default())
        .unwrap_err();

    assert!(err.to_string().contains("already subscribed"));
    assert_eq!(engine.room_count(), 1);
}

/// A connection cannot exceed its room limit.
#[test]
fn test_room_limit_enforced() {
    let engine = RealtimeEngine::without_transport().with_config(fluxfeed::EngineConfig {
        max_rooms_per_connection: 1,
        ..fluxfeed::EngineConfig::default()
    });

    engine
        .subscribe(
            "conn-1",
            &users(),
            &json!({"term": {"city": "NYC"}}),
            ChannelOptions::default(),
        )
        .unwrap();
    let err = engine
        .subscribe(
            "conn-1",
            &users(),
            &json!({"term": {"city": "LA"}}),
            ChannelOptions::default(),
        )
        .unwrap_err();

    assert!(err.to_string().contains("Too many rooms"));
}

// =============================================================================
// Introspection Tests
// =============================================================================

/// Listing only reveals namespaces the policy admits.
#[test]
fn test_listing_respects_authorization() {
    #[derive(Debug)]
    struct UsersOnly;
    impl Authorization for UsersOnly {
        fn can_list(&self, _connection_id: &str, namespace: &Namespace) -> bool {
            namespace.collection == "users"
        }
    }

    let engine = RealtimeEngine::without_transport().with_authorization(Arc::new(UsersOnly));
    let sub = engine
        .subscribe(
            "conn-1",
            &users(),
            &json!({"term": {"city": "NYC"}}),
            ChannelOptions::default(),
        )
        .unwrap();
    engine
        .subscribe(
            "conn-1",
            &posts(),
            &json!({"exists": "title"}),
            ChannelOptions::default(),
        )
        .unwrap();

    let listing = engine.list_subscriptions("conn-1").unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[&users()][&sub.room_id], 1);
}

/// Lifecycle counters add up after a churn of subscriptions.
#[test]
fn test_metrics_after_churn() {
    let engine = engine();
    let filter = json!({"term": {"city": "NYC"}});

    let sub = engine
        .subscribe("conn-1", &users(), &filter, ChannelOptions::default())
        .unwrap();
    engine
        .subscribe("conn-2", &users(), &filter, ChannelOptions::default())
        .unwrap();
    engine.unsubscribe("conn-1", &sub.room_id).unwrap();
    engine.remove_connection("conn-2").unwrap();

    let snapshot = engine.metrics();
    assert_eq!(snapshot.rooms_created, 1);
    assert_eq!(snapshot.rooms_destroyed, 1);
    assert_eq!(snapshot.subscriptions_created, 2);
    assert_eq!(snapshot.subscriptions_removed, 2);
    assert_eq!(snapshot.connections_evicted, 1);
}
