//! # Subscription Registry
//!
//! Rooms (one per unique compiled filter within a namespace), their wire
//! channels, and the connections attached to them.

pub mod errors;
pub mod room;
pub mod store;

pub use errors::{RegistryError, RegistryResult};
pub use room::{Channel, ChannelOptions, Room, ScopeFilter, StateFilter, UsersFilter};
pub use store::{Subscribed, SubscriptionStore, Unsubscribed};
