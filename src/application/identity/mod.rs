//! Identity module: registration, login and profile
//!
//! Contains the `AuthService` which orchestrates the account use-cases on
//! top of the user directory, the credential hasher and the token issuer.

pub mod service;

pub use service::{AuthService, LoginOutcome};
