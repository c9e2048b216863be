pub mod error;
pub mod user;

// Re-export commonly used types
pub use error::{DomainError, DomainResult};
pub use user::{display_name_from_email, NewUser, User, UserDirectory, UserLookup};
