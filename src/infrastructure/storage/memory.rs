//! In-memory user directory

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::{DomainError, DomainResult, NewUser, User, UserDirectory, UserLookup};

/// In-memory directory for development and testing.
///
/// The email index is the uniqueness guard: an email is claimed through a
/// single map entry, so two concurrent creations cannot both succeed.
pub struct InMemoryUserDirectory {
    users: DashMap<i64, User>,
    email_index: DashMap<String, i64>,
    id_counter: AtomicI64,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            email_index: DashMap::new(),
            id_counter: AtomicI64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_user(&self, lookup: UserLookup<'_>) -> DomainResult<Option<User>> {
        let found = match lookup {
            UserLookup::Id(id) => self.users.get(&id).map(|u| u.clone()),
            UserLookup::Email(email) => self
                .email_index
                .get(email)
                .and_then(|id| self.users.get(&*id).map(|u| u.clone())),
            UserLookup::Name(name) => self
                .users
                .iter()
                .filter(|u| u.name == name)
                .min_by_key(|u| u.id)
                .map(|u| u.clone()),
        };

        Ok(found)
    }

    async fn create_user(&self, new_user: NewUser) -> DomainResult<User> {
        match self.email_index.entry(new_user.email.clone()) {
            Entry::Occupied(_) => Err(DomainError::EmailExists(new_user.email)),
            Entry::Vacant(slot) => {
                let id = self.id_counter.fetch_add(1, Ordering::SeqCst);
                let now = Utc::now();
                let user = User {
                    id,
                    name: new_user.name,
                    email: new_user.email,
                    password_hash: new_user.password_hash,
                    created_at: now,
                    updated_at: now,
                };

                self.users.insert(id, user.clone());
                slot.insert(id);
                Ok(user)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: "digest".to_string(),
        }
    }

    #[tokio::test]
    async fn create_then_find_by_each_attribute() {
        let dir = InMemoryUserDirectory::new();
        let created = dir.create_user(new_user("a", "a@b.com")).await.unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(
            dir.find_user(UserLookup::Email("a@b.com")).await.unwrap(),
            Some(created.clone())
        );
        assert_eq!(dir.find_user(UserLookup::Id(1)).await.unwrap(), Some(created.clone()));
        assert_eq!(dir.find_user(UserLookup::Name("a")).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn missing_user_is_none() {
        let dir = InMemoryUserDirectory::new();

        assert_eq!(dir.find_user(UserLookup::Id(0)).await.unwrap(), None);
        assert_eq!(dir.find_user(UserLookup::Email("a@b.com")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_without_mutation() {
        let dir = InMemoryUserDirectory::new();
        dir.create_user(new_user("a", "a@b.com")).await.unwrap();

        let err = dir.create_user(new_user("other", "a@b.com")).await.unwrap_err();

        assert_eq!(err, DomainError::EmailExists("a@b.com".to_string()));
        assert_eq!(dir.len(), 1);
        assert!(dir.find_user(UserLookup::Name("other")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_creations_of_one_email_admit_exactly_one() {
        let dir = Arc::new(InMemoryUserDirectory::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let dir = dir.clone();
                tokio::spawn(async move {
                    dir.create_user(new_user(&format!("n{}", i), "race@b.com")).await
                })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(e) => assert!(matches!(e, DomainError::EmailExists(_))),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(dir.len(), 1);
    }
}
