//! Application ports (hexagonal architecture boundaries)
//!
//! The inbound contract of the user store is `domain::UserDirectory`.
//! Outbound ports to delivery services live here.

pub mod outbound;

pub use outbound::{dispatch, Notification, NotificationError, Notifier};
