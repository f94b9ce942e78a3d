use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;

use crate::app::AppState;
use crate::auth::AuthUser;
use crate::authz::issue_token;
use crate::db::registry;
use crate::errors::{AppError, AppResult};
use crate::models::user::{DbUser, LoginRequest, LoginResponse, RegisterRequest, User};
use crate::routes::MessageResponse;
use crate::utils::{hash_password, hash_token, utc_now, verify_password};

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = User),
        (status = 409, description = "Name already in use")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }
    ensure_name_available(&state.pool, name).await?;

    let password_hash = hash_password(&payload.password)?;
    let now = utc_now();

    let mut tx = state.pool.begin().await?;

    let default_role = registry::find_role_by_name(&mut tx, &state.config.default_role)
        .await?
        .ok_or_else(|| {
            AppError::configuration(format!("default role '{}' is not seeded", state.config.default_role))
        })?;

    let user_id = sqlx::query("INSERT INTO users (name, password_hash, registration_time) VALUES (?, ?, ?)")
        .bind(name)
        .bind(password_hash)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

    registry::assign_role(&mut tx, user_id, default_role.id).await?;
    tx.commit().await?;

    tracing::info!(user_id, role = %default_role.name, "user registered");

    let user = User {
        id: user_id,
        name: name.to_string(),
        registration_time: now,
    };

    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let db_user = sqlx::query_as::<_, DbUser>(
        "SELECT id, name, password_hash, registration_time FROM users WHERE name = ?",
    )
    .bind(payload.name.trim())
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::unauthorized("invalid credentials"))?;

    if !verify_password(&payload.password, &db_user.password_hash)? {
        return Err(AppError::unauthorized("invalid credentials"));
    }

    let issued = issue_token(&state.pool, db_user.id, utc_now()).await?;

    Ok(Json(LoginResponse {
        expires_at: issued.record.expires_at(state.tokens.ttl()),
        token: issued.token,
    }))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    responses((status = 200, description = "Current user", body = User)),
    security(("tokenAuth" = []))
)]
pub async fn me(auth: AuthUser) -> AppResult<Json<User>> {
    Ok(Json(auth.user))
}

/// Revokes the token used for this request. Other tokens of the user stay valid.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Logout acknowledged")),
    security(("tokenAuth" = []))
)]
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<MessageResponse>> {
    sqlx::query("DELETE FROM tokens WHERE token_hash = ? AND user_id = ?")
        .bind(hash_token(&auth.token))
        .bind(auth.user.id)
        .execute(&state.pool)
        .await?;

    Ok(Json(MessageResponse::new("Logged out")))
}

async fn ensure_name_available(pool: &SqlitePool, name: &str) -> AppResult<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await?;

    if count > 0 {
        return Err(AppError::conflict("name already in use"));
    }

    Ok(())
}
