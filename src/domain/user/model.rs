use chrono::{DateTime, Utc};

/// Registered account.
///
/// `password_hash` always holds a PHC digest, never plaintext. It must not be
/// serialized towards untrusted clients; the HTTP layer maps this into its own DTO.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Attribute a user can be looked up by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserLookup<'a> {
    Email(&'a str),
    Id(i64),
    /// Names are derived from email local parts and are not unique; the
    /// lowest id carrying the name wins.
    Name(&'a str),
}

/// Display name for a new account: the email's local part.
///
/// Returns `None` when there is no `@` or nothing precedes it.
pub fn display_name_from_email(email: &str) -> Option<&str> {
    match email.split_once('@') {
        Some((local, _)) if !local.is_empty() => Some(local),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_part_becomes_the_name() {
        assert_eq!(display_name_from_email("a@b.com"), Some("a"));
        assert_eq!(display_name_from_email("first.last@example.org"), Some("first.last"));
    }

    #[test]
    fn splits_on_the_first_at_sign() {
        assert_eq!(display_name_from_email("x@y@z"), Some("x"));
    }

    #[test]
    fn rejects_addresses_without_local_part() {
        assert_eq!(display_name_from_email("no-at-sign"), None);
        assert_eq!(display_name_from_email("@example.org"), None);
        assert_eq!(display_name_from_email(""), None);
    }
}
