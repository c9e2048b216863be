//! Outbound notification delivery

pub mod mail_api;

pub use mail_api::{MailApiConfig, MailApiNotifier};
