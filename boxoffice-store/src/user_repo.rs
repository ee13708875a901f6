use async_trait::async_trait;
use boxoffice_core::{credentials, Entity, StoreError, StoreResult, UserDirectory};
use boxoffice_shared::{Masked, NewUser, User, UserId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::map_sqlx;

pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: Option<String>,
    is_admin: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId(row.id),
            username: row.username,
            email: row.email.map(Masked),
            is_admin: row.is_admin,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let password_hash = credentials::hash_password(&new_user.password)?;
        let user = User {
            id: UserId::new(),
            username: new_user.username,
            email: new_user.email.map(Masked),
            is_admin: new_user.is_admin,
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, is_admin)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id.0)
        .bind(&user.username)
        .bind(user.email.as_ref().map(|e| e.expose().as_str()))
        .bind(&password_hash)
        .bind(user.is_admin)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> StoreResult<User> {
        sqlx::query_as::<_, UserRow>("SELECT id, username, email, is_admin FROM users WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?
            .map(User::from)
            .ok_or_else(|| StoreError::not_found(Entity::User, id))
    }

    async fn find_credentials(&self, username: &str) -> StoreResult<Option<(User, String)>> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT id, username, email, is_admin, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(row.map(|r| (User::from(r.user), r.password_hash)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_stays_masked_after_load() {
        let user = User::from(UserRow {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: Some("alice@example.com".into()),
            is_admin: false,
        });
        let shown = format!("{:?}", user);
        assert!(!shown.contains("alice@example.com"));
        assert_eq!(user.email.unwrap().into_inner(), "alice@example.com");
    }
}
