//! Domain errors

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Validation: {0}")]
    Validation(String),

    #[error("Email already registered: {0}")]
    EmailExists(String),

    #[error("No user registered with email {0}")]
    EmailNotFound(String),

    #[error("Wrong password")]
    WrongPassword,

    #[error("User {0} does not exist")]
    InvalidUser(i64),

    #[error("Invalid authentication token")]
    InvalidToken,

    #[error("Authentication token has expired")]
    ExpiredToken,

    /// The boundary let through an address without a usable local part.
    #[error("Malformed email reached the service: {0}")]
    MalformedEmail(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl DomainError {
    /// Stable machine-readable code exposed to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::EmailExists(_) => "EMAIL_EXISTS",
            Self::EmailNotFound(_) => "EMAIL_NOT_FOUND",
            Self::WrongPassword => "WRONG_PASSWORD",
            Self::InvalidUser(_) => "INVALID_USER",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::ExpiredToken => "TOKEN_EXPIRED",
            Self::MalformedEmail(_) | Self::Hashing(_) | Self::Signing(_) | Self::Persistence(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    /// Whether the caller can fix the request. Everything else is a server fault
    /// whose detail must stay in the logs.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::MalformedEmail(_) | Self::Hashing(_) | Self::Signing(_) | Self::Persistence(_)
        )
    }
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
