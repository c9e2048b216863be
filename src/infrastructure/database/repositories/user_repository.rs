use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr, Statement,
};
use tracing::error;

use crate::domain::{DomainError, DomainResult, NewUser, User, UserDirectory, UserLookup};
use crate::infrastructure::database::entities::user;

pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn user_model_to_domain(model: user::Model) -> User {
    User {
        id: model.id,
        name: model.name,
        email: model.email,
        password_hash: model.password_hash,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    error!(error = %e, "Database error");
    DomainError::Persistence(e.to_string())
}

// ── Repository implementation ───────────────────────────────────

#[async_trait]
impl UserDirectory for UserRepository {
    async fn find_user(&self, lookup: UserLookup<'_>) -> DomainResult<Option<User>> {
        let query = match lookup {
            UserLookup::Id(id) => user::Entity::find_by_id(id),
            UserLookup::Email(email) => {
                user::Entity::find().filter(user::Column::Email.eq(email))
            }
            UserLookup::Name(name) => user::Entity::find()
                .filter(user::Column::Name.eq(name))
                .order_by_asc(user::Column::Id),
        };

        let model = query.one(&self.db).await.map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn create_user(&self, new_user: NewUser) -> DomainResult<User> {
        let now = Utc::now();
        let email = new_user.email.clone();

        let active = user::ActiveModel {
            name: Set(new_user.name),
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(&self.db).await.map_err(|e| {
            if let Some(SqlErr::UniqueConstraintViolation(_)) = e.sql_err() {
                DomainError::EmailExists(email)
            } else {
                db_err(e)
            }
        })?;

        Ok(user_model_to_domain(model))
    }

    async fn health_check(&self) -> DomainResult<()> {
        self.db
            .execute(Statement::from_string(
                self.db.get_database_backend(),
                "SELECT 1".to_string(),
            ))
            .await
            .map_err(db_err)?;

        Ok(())
    }
}
