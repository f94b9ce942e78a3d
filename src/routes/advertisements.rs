use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;

use crate::app::AppState;
use crate::auth::AuthUser;
use crate::authz::Target;
use crate::errors::{AppError, AppResult};
use crate::models::advertisement::{
    Advertisement, AdvertisementCreateRequest, AdvertisementFilter, AdvertisementUpdateRequest,
};
use crate::models::rbac::{Action, ResourceKind};
use crate::utils::utc_now;

const SELECT_COLUMNS: &str = "SELECT id, title, description, price, date_create, user_id FROM advertisements";

/// Advertisements the caller may read. Unreadable rows are left out rather than rejected.
#[utoipa::path(
    get,
    path = "/advertisements",
    tag = "Advertisements",
    params(AdvertisementFilter),
    responses((status = 200, description = "Readable advertisements", body = [Advertisement])),
    security(("tokenAuth" = []))
)]
pub async fn list_advertisements(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filter): Query<AdvertisementFilter>,
) -> AppResult<Json<Vec<Advertisement>>> {
    let rows = match filter.title.as_deref() {
        Some(title) => {
            sqlx::query_as::<_, Advertisement>(&format!("{SELECT_COLUMNS} WHERE title = ? ORDER BY id"))
                .bind(title)
                .fetch_all(&state.pool)
                .await?
        }
        None => {
            sqlx::query_as::<_, Advertisement>(&format!("{SELECT_COLUMNS} ORDER BY id"))
                .fetch_all(&state.pool)
                .await?
        }
    };

    let visible = state.authz.filter_readable(&auth.user, rows).await?;
    Ok(Json(visible))
}

#[utoipa::path(
    post,
    path = "/advertisements",
    tag = "Advertisements",
    request_body = AdvertisementCreateRequest,
    responses(
        (status = 201, description = "Advertisement created", body = Advertisement),
        (status = 403, description = "No write right on advertisements"),
        (status = 409, description = "Title already in use")
    ),
    security(("tokenAuth" = []))
)]
pub async fn create_advertisement(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<AdvertisementCreateRequest>,
) -> AppResult<(StatusCode, Json<Advertisement>)> {
    // The new listing belongs to the caller, so own-only write rights cover it.
    state
        .authz
        .require(
            &auth.user,
            Target::owned_by(ResourceKind::Advertisement, auth.user.id),
            Action::Write,
        )
        .await?;

    let title = validate_title(&payload.title)?;
    validate_price(payload.price)?;
    let now = utc_now();

    let id = sqlx::query(
        "INSERT INTO advertisements (title, description, price, date_create, user_id) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(title)
    .bind(&payload.description)
    .bind(payload.price)
    .bind(now)
    .bind(auth.user.id)
    .execute(&state.pool)
    .await
    .map_err(title_conflict)?
    .last_insert_rowid();

    let advertisement = fetch_advertisement(&state.pool, id).await?;
    Ok((StatusCode::CREATED, Json(advertisement)))
}

#[utoipa::path(
    get,
    path = "/advertisements/{id}",
    tag = "Advertisements",
    params(("id" = i64, Path, description = "Advertisement id")),
    responses(
        (status = 200, description = "Advertisement detail", body = Advertisement),
        (status = 404, description = "Advertisement not found or not readable")
    ),
    security(("tokenAuth" = []))
)]
pub async fn get_advertisement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Advertisement>> {
    let advertisement = fetch_advertisement(&state.pool, id).await?;

    if !state
        .authz
        .authorize(&auth.user, Target::instance(&advertisement), Action::Read)
        .await?
    {
        return Err(AppError::not_found("advertisement not found"));
    }

    Ok(Json(advertisement))
}

#[utoipa::path(
    patch,
    path = "/advertisements/{id}",
    tag = "Advertisements",
    params(("id" = i64, Path, description = "Advertisement id")),
    request_body = AdvertisementUpdateRequest,
    responses(
        (status = 200, description = "Advertisement updated", body = Advertisement),
        (status = 403, description = "Not allowed to modify this advertisement")
    ),
    security(("tokenAuth" = []))
)]
pub async fn update_advertisement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<AdvertisementUpdateRequest>,
) -> AppResult<Json<Advertisement>> {
    let mut advertisement = fetch_advertisement(&state.pool, id).await?;
    state
        .authz
        .require(&auth.user, Target::instance(&advertisement), Action::Write)
        .await?;

    if let Some(title) = payload.title.as_deref() {
        advertisement.title = validate_title(title)?.to_string();
    }
    if let Some(description) = payload.description {
        advertisement.description = description;
    }
    if let Some(price) = payload.price {
        validate_price(price)?;
        advertisement.price = price;
    }

    sqlx::query("UPDATE advertisements SET title = ?, description = ?, price = ? WHERE id = ?")
        .bind(&advertisement.title)
        .bind(&advertisement.description)
        .bind(advertisement.price)
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(title_conflict)?;

    Ok(Json(advertisement))
}

#[utoipa::path(
    delete,
    path = "/advertisements/{id}",
    tag = "Advertisements",
    params(("id" = i64, Path, description = "Advertisement id")),
    responses(
        (status = 204, description = "Advertisement deleted"),
        (status = 403, description = "Not allowed to delete this advertisement")
    ),
    security(("tokenAuth" = []))
)]
pub async fn delete_advertisement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let advertisement = fetch_advertisement(&state.pool, id).await?;
    state
        .authz
        .require(&auth.user, Target::instance(&advertisement), Action::Write)
        .await?;

    sqlx::query("DELETE FROM advertisements WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_advertisement(pool: &SqlitePool, id: i64) -> AppResult<Advertisement> {
    sqlx::query_as::<_, Advertisement>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("advertisement not found"))
}

fn validate_title(title: &str) -> AppResult<&str> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::bad_request("title must not be empty"));
    }
    Ok(title)
}

fn validate_price(price: i64) -> AppResult<()> {
    if price < 0 {
        return Err(AppError::bad_request("price must not be negative"));
    }
    Ok(())
}

fn title_conflict(err: sqlx::Error) -> AppError {
    match AppError::from(err) {
        AppError::Conflict(_) => AppError::conflict("title already in use"),
        other => other,
    }
}
