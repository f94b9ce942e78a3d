use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

use super::store::AuthStore;
use crate::errors::{AppError, AppResult};
use crate::models::token::Token;
use crate::models::user::User;
use crate::utils::{generate_token, hash_token, utc_now};

/// Resolves presented token values to users.
#[derive(Clone)]
pub struct TokenValidator {
    store: Arc<dyn AuthStore>,
    ttl: Duration,
}

impl TokenValidator {
    pub fn new(store: Arc<dyn AuthStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn resolve(&self, raw_token: &str) -> AppResult<User> {
        self.resolve_at(raw_token, utc_now()).await
    }

    /// Resolve as of `now`. Does not touch the token: validity is a fixed
    /// window from its creation time.
    pub async fn resolve_at(&self, raw_token: &str, now: DateTime<Utc>) -> AppResult<User> {
        if raw_token.is_empty() {
            return Err(AppError::unauthorized("invalid token"));
        }

        let token = match self.store.find_token(&hash_token(raw_token)).await? {
            Some(token) if token.is_valid_at(now, self.ttl) => token,
            Some(token) => {
                tracing::debug!(token_id = token.id, user_id = token.user_id, "token expired");
                return Err(AppError::unauthorized("invalid token"));
            }
            None => {
                tracing::debug!("unknown token presented");
                return Err(AppError::unauthorized("invalid token"));
            }
        };

        self.store
            .find_user(token.user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("invalid token"))
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The raw value handed to the client. Never persisted.
    pub token: String,
    pub record: Token,
}

/// Create a fresh token for `user_id`, storing only its digest.
pub async fn issue_token(pool: &SqlitePool, user_id: i64, now: DateTime<Utc>) -> AppResult<IssuedToken> {
    let token = generate_token();
    let token_hash = hash_token(&token);

    let id = sqlx::query("INSERT INTO tokens (token_hash, user_id, creation_time) VALUES (?, ?, ?)")
        .bind(&token_hash)
        .bind(user_id)
        .bind(now)
        .execute(pool)
        .await?
        .last_insert_rowid();

    tracing::debug!(user_id, token_id = id, "issued token");

    Ok(IssuedToken {
        token,
        record: Token {
            id,
            token_hash,
            user_id,
            creation_time: now,
        },
    })
}
