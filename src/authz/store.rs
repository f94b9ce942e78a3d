use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::errors::AppResult;
use crate::models::rbac::Right;
use crate::models::token::Token;
use crate::models::user::{DbUser, User};

/// Read-side persistence the authorization core depends on.
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Look up a token by the digest of its value, regardless of age.
    async fn find_token(&self, token_hash: &str) -> AppResult<Option<Token>>;

    async fn find_user(&self, user_id: i64) -> AppResult<Option<User>>;

    /// Every right reachable from any role assigned to the user.
    async fn rights_for_user(&self, user_id: i64) -> AppResult<Vec<Right>>;
}

#[derive(Debug, Clone)]
pub struct SqliteAuthStore {
    pool: SqlitePool,
}

impl SqliteAuthStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthStore for SqliteAuthStore {
    async fn find_token(&self, token_hash: &str) -> AppResult<Option<Token>> {
        let token = sqlx::query_as::<_, Token>(
            "SELECT id, token_hash, user_id, creation_time FROM tokens WHERE token_hash = ?",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn find_user(&self, user_id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, DbUser>(
            "SELECT id, name, password_hash, registration_time FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user.map(User::from))
    }

    async fn rights_for_user(&self, user_id: i64) -> AppResult<Vec<Right>> {
        let rights = sqlx::query_as::<_, Right>(
            r#"
            SELECT DISTINCT r.id, r.model, r.read, r.write, r.only_own
            FROM rights r
            INNER JOIN role_rights rr ON rr.right_id = r.id
            INNER JOIN user_roles ur ON ur.role_id = rr.role_id
            WHERE ur.user_id = ?
            ORDER BY r.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rights)
    }
}
