//! # Notification Subsystem
//!
//! Document events in, channel deliveries out: the channel resolver, the
//! match-cache-diffing notifier, and the transport seam.

pub mod errors;
pub mod event;
pub mod notifier;
pub mod resolver;
pub mod transport;

pub use errors::{DeliveryError, DeliveryResult};
pub use event::{
    DocumentAction, DocumentEvent, DocumentNotification, Notification, NotificationContext,
    Scope, UserDirection, UserNotification, WriteState,
};
pub use notifier::{Notifier, NotifyReport, Outbound, Plan};
pub use resolver::resolve_channels;
pub use transport::{LocalTransport, NotificationReceiver, NullTransport, Transport};
