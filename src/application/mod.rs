pub mod identity;
pub mod ports;

// Re-export key types for convenience
pub use identity::{AuthService, LoginOutcome};
pub use ports::{Notification, NotificationError, Notifier};
