//! fluxfeed - A content-based real-time subscription engine
//!
//! Clients subscribe with a filter over a namespace; document writes are
//! matched against all live filters and notifications are fanned out to
//! the resolved channels.

pub mod config;
pub mod engine;
pub mod filter;
pub mod matching;
pub mod notify;
pub mod observability;
pub mod registry;
pub mod types;

pub use config::EngineConfig;
pub use engine::{AllowAll, Authorization, RealtimeEngine};
pub use notify::{DocumentEvent, Notification, NotifyReport};
pub use registry::{ChannelOptions, ScopeFilter, StateFilter, UsersFilter};
pub use types::{ChannelId, ConnectionId, Namespace, RoomId};
