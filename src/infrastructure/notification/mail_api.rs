//! Mail API notifier
//!
//! Posts one JSON message per notification to an HTTP mail-sending API,
//! authenticated with an access key pair.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::application::ports::{Notification, NotificationError, Notifier};

/// Settings for [`MailApiNotifier`].
#[derive(Clone)]
pub struct MailApiConfig {
    pub endpoint: String,
    pub access_key_id: String,
    pub access_key_secret: String,
    pub from_address: String,
    pub from_alias: String,
    pub timeout: Duration,
}

impl Default for MailApiConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_key_id: String::new(),
            access_key_secret: String::new(),
            from_address: String::new(),
            from_alias: String::new(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl MailApiConfig {
    /// Both halves of the key pair are present.
    pub fn has_credentials(&self) -> bool {
        !self.access_key_id.is_empty() && !self.access_key_secret.is_empty()
    }
}

impl std::fmt::Debug for MailApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailApiConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("from_address", &self.from_address)
            .field("from_alias", &self.from_alias)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct SendMailRequest<'a> {
    account_name: &'a str,
    from_alias: &'a str,
    to_address: &'a str,
    subject: &'a str,
    html_body: &'a str,
    reply_to_address: bool,
}

pub struct MailApiNotifier {
    http: Client,
    config: MailApiConfig,
}

impl MailApiNotifier {
    pub fn new(config: MailApiConfig) -> Result<Self, NotificationError> {
        if config.timeout.is_zero() {
            return Err(NotificationError::Transport(
                "mail API timeout must be non-zero".into(),
            ));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &MailApiConfig {
        &self.config
    }
}

#[async_trait]
impl Notifier for MailApiNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        if !self.config.has_credentials() {
            warn!(to = %notification.to, "Mail API key pair is empty, skipping notification");
            return Ok(());
        }

        let payload = SendMailRequest {
            account_name: &self.config.from_address,
            from_alias: &self.config.from_alias,
            to_address: &notification.to,
            subject: &notification.subject,
            html_body: &notification.body,
            reply_to_address: true,
        };

        let response = self
            .http
            .post(&self.config.endpoint)
            .basic_auth(&self.config.access_key_id, Some(&self.config.access_key_secret))
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(to = %notification.to, status = status.as_u16(), "Mail API accepted message");
        Ok(())
    }
}
