//! User aggregate
//!
//! Contains the User entity, the creation DTO, and the directory interface.

pub mod model;
pub mod repository;

mod dto_create;

pub use model::{display_name_from_email, User, UserLookup};

pub use dto_create::NewUser;

pub use repository::UserDirectory;
