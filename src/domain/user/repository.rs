use async_trait::async_trait;

use super::{NewUser, User, UserLookup};
use crate::domain::DomainResult;

/// Lookup / insert store behind the auth service.
///
/// Absence is `Ok(None)`. `create_user` must report an email uniqueness
/// violation as `DomainError::EmailExists` and any other store failure as
/// `DomainError::Persistence`.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, lookup: UserLookup<'_>) -> DomainResult<Option<User>>;

    async fn create_user(&self, new_user: NewUser) -> DomainResult<User>;

    async fn health_check(&self) -> DomainResult<()> {
        Ok(())
    }
}
