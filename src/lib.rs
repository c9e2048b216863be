//! # Identity Service
//!
//! Account registration, password login and bearer-token identity for a
//! web backend.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: the `User` entity, the `UserDirectory` trait and `DomainError`
//! - **application**: `AuthService` (register / login / profile) and outbound ports
//! - **infrastructure**: Argon2 hashing, JWT issuing, SeaORM and in-memory
//!   directories, the mail API notifier
//! - **interfaces**: REST API with Swagger documentation
//! - **server**: runtime assembly and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use application::{AuthService, LoginOutcome};
pub use config::{default_config_path, AppConfig};
pub use domain::{DomainError, DomainResult, User};
pub use interfaces::http::create_api_router;
pub use server::{init_tracing, ServerHandle, ServerOptions};
