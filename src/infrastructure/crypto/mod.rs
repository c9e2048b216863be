//! Credential hashing and session tokens

pub mod jwt;
pub mod password;

pub use jwt::{IssuedToken, JwtConfig, JwtIssuer, TokenClaims, VerifiedIdentity};
pub use password::{CredentialHasher, HashingParams};
