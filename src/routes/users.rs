use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;

use crate::app::AppState;
use crate::auth::AuthUser;
use crate::authz::Target;
use crate::errors::{AppError, AppResult};
use crate::models::rbac::Action;
use crate::models::user::{DbUser, User, UserUpdateRequest};
use crate::utils::hash_password;

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User detail", body = User),
        (status = 404, description = "User not found or not readable")
    ),
    security(("tokenAuth" = []))
)]
pub async fn get_user(State(state): State<AppState>, auth: AuthUser, Path(id): Path<i64>) -> AppResult<Json<User>> {
    let user: User = fetch_user(&state.pool, id).await?.into();

    if !state
        .authz
        .authorize(&auth.user, Target::instance(&user), Action::Read)
        .await?
    {
        return Err(AppError::not_found("user not found"));
    }

    Ok(Json(user))
}

#[utoipa::path(
    patch,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "User id")),
    request_body = UserUpdateRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 403, description = "Not allowed to modify this user"),
        (status = 409, description = "Name already in use")
    ),
    security(("tokenAuth" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UserUpdateRequest>,
) -> AppResult<Json<User>> {
    let mut db_user = fetch_user(&state.pool, id).await?;
    let target = User::from(db_user.clone());
    state
        .authz
        .require(&auth.user, Target::instance(&target), Action::Write)
        .await?;

    if let Some(name) = payload.name.as_deref() {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::bad_request("name must not be empty"));
        }
        db_user.name = name.to_string();
    }
    if let Some(password) = payload.password.as_deref() {
        db_user.password_hash = hash_password(password)?;
    }

    sqlx::query("UPDATE users SET name = ?, password_hash = ? WHERE id = ?")
        .bind(&db_user.name)
        .bind(&db_user.password_hash)
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(|err| match AppError::from(err) {
            AppError::Conflict(_) => AppError::conflict("name already in use"),
            other => other,
        })?;

    Ok(Json(db_user.into()))
}

/// Deletes the user together with their tokens, role assignments and advertisements.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Not allowed to delete this user")
    ),
    security(("tokenAuth" = []))
)]
pub async fn delete_user(State(state): State<AppState>, auth: AuthUser, Path(id): Path<i64>) -> AppResult<StatusCode> {
    let user: User = fetch_user(&state.pool, id).await?.into();
    state
        .authz
        .require(&auth.user, Target::instance(&user), Action::Write)
        .await?;

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;

    tracing::info!(user_id = id, actor_id = auth.user.id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_user(pool: &SqlitePool, id: i64) -> AppResult<DbUser> {
    sqlx::query_as::<_, DbUser>("SELECT id, name, password_hash, registration_time FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))
}
