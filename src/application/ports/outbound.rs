//! Outbound ports for talking to delivery services
//!
//! [`Notifier`] decouples application services from the concrete delivery
//! transport. The production implementation is
//! [`MailApiNotifier`](crate::infrastructure::notification::MailApiNotifier).

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification transport error: {0}")]
    Transport(String),

    #[error("Notification rejected by provider (status {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// A single outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Fire-and-forget delivery. Failures are logged, never returned.
pub fn dispatch(notifier: Arc<dyn Notifier>, notification: Notification) {
    tokio::spawn(async move {
        match notifier.send(&notification).await {
            Ok(()) => debug!(to = %notification.to, "Notification delivered"),
            Err(e) => warn!(to = %notification.to, error = %e, "Notification delivery failed"),
        }
    });
}
