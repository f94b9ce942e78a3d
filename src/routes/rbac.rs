//! RBAC admin API routes
//!
//! Endpoints for managing roles, rights, and user role assignments.
//! Role endpoints and assignments are gated on the `role` kind, right
//! definitions on the `right` kind. Neither kind has an owner, so own-only
//! rights on them are not narrowed.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::app::AppState;
use crate::auth::AuthUser;
use crate::authz::Target;
use crate::db::registry;
use crate::errors::AppError;
use crate::models::rbac::*;

// =============================================================================
// ROUTER
// =============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        // Roles
        .route("/roles", get(list_roles).post(create_role))
        .route("/roles/:role_id", get(get_role).delete(delete_role))
        .route("/roles/:role_id/rights", get(get_role_rights).post(attach_right_to_role))
        .route("/roles/:role_id/rights/:right_id", delete(detach_right_from_role))
        // Rights
        .route("/rights", get(list_rights).post(create_right))
        // User role assignments
        .route("/users/:user_id/roles", get(get_user_roles).post(assign_role_to_user))
        .route("/users/:user_id/roles/:role_id", delete(revoke_role_from_user))
        // Effective rights (computed)
        .route("/users/:user_id/rights", get(get_effective_rights))
}

async fn require(state: &AppState, auth: &AuthUser, kind: ResourceKind, action: Action) -> Result<(), AppError> {
    state.authz.require(&auth.user, Target::kind(kind), action).await
}

// =============================================================================
// ROLE ENDPOINTS
// =============================================================================

/// List all roles
#[utoipa::path(
    get,
    path = "/rbac/roles",
    tag = "RBAC",
    responses(
        (status = 200, description = "List of roles", body = Vec<Role>),
    ),
    security(("tokenAuth" = []))
)]
pub async fn list_roles(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<Role>>, AppError> {
    require(&state, &auth, ResourceKind::Role, Action::Read).await?;
    Ok(Json(registry::list_roles(&state.pool).await?))
}

/// Create a new role
#[utoipa::path(
    post,
    path = "/rbac/roles",
    tag = "RBAC",
    request_body = RoleCreateRequest,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 409, description = "Role name already exists"),
    ),
    security(("tokenAuth" = []))
)]
pub async fn create_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<RoleCreateRequest>,
) -> Result<(StatusCode, Json<Role>), AppError> {
    require(&state, &auth, ResourceKind::Role, Action::Write).await?;

    let mut conn = state.pool.acquire().await?;
    let role = registry::create_role(&mut conn, &req.name).await?;

    tracing::info!(actor_id = auth.user.id, role_id = role.id, role = %role.name, "role created");
    Ok((StatusCode::CREATED, Json(role)))
}

/// Get a role with its rights
#[utoipa::path(
    get,
    path = "/rbac/roles/{role_id}",
    tag = "RBAC",
    params(
        ("role_id" = i64, Path, description = "Role ID"),
    ),
    responses(
        (status = 200, description = "Role details", body = RoleWithRights),
        (status = 404, description = "Role not found"),
    ),
    security(("tokenAuth" = []))
)]
pub async fn get_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(role_id): Path<i64>,
) -> Result<Json<RoleWithRights>, AppError> {
    require(&state, &auth, ResourceKind::Role, Action::Read).await?;

    let mut conn = state.pool.acquire().await?;
    let role = registry::find_role(&mut conn, role_id).await?;
    drop(conn);
    let rights = registry::rights_for_role(&state.pool, role_id).await?;

    Ok(Json(RoleWithRights { role, rights }))
}

/// Delete a role
#[utoipa::path(
    delete,
    path = "/rbac/roles/{role_id}",
    tag = "RBAC",
    params(
        ("role_id" = i64, Path, description = "Role ID"),
    ),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 404, description = "Role not found"),
    ),
    security(("tokenAuth" = []))
)]
pub async fn delete_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(role_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    require(&state, &auth, ResourceKind::Role, Action::Write).await?;

    let mut conn = state.pool.acquire().await?;
    let role = registry::delete_role(&mut conn, role_id).await?;

    tracing::info!(actor_id = auth.user.id, role_id, role = %role.name, "role deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// List the rights attached to a role
#[utoipa::path(
    get,
    path = "/rbac/roles/{role_id}/rights",
    tag = "RBAC",
    params(
        ("role_id" = i64, Path, description = "Role ID"),
    ),
    responses(
        (status = 200, description = "Rights of the role", body = Vec<Right>),
        (status = 404, description = "Role not found"),
    ),
    security(("tokenAuth" = []))
)]
pub async fn get_role_rights(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(role_id): Path<i64>,
) -> Result<Json<Vec<Right>>, AppError> {
    require(&state, &auth, ResourceKind::Role, Action::Read).await?;

    let mut conn = state.pool.acquire().await?;
    registry::find_role(&mut conn, role_id).await?;
    drop(conn);

    Ok(Json(registry::rights_for_role(&state.pool, role_id).await?))
}

/// Attach a right to a role
#[utoipa::path(
    post,
    path = "/rbac/roles/{role_id}/rights",
    tag = "RBAC",
    params(
        ("role_id" = i64, Path, description = "Role ID"),
    ),
    request_body = AttachRightRequest,
    responses(
        (status = 201, description = "Right attached", body = RoleRight),
        (status = 404, description = "Role or right not found"),
        (status = 409, description = "Right already attached"),
    ),
    security(("tokenAuth" = []))
)]
pub async fn attach_right_to_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(role_id): Path<i64>,
    Json(req): Json<AttachRightRequest>,
) -> Result<(StatusCode, Json<RoleRight>), AppError> {
    require(&state, &auth, ResourceKind::Role, Action::Write).await?;

    let mut conn = state.pool.acquire().await?;
    registry::attach_right(&mut conn, role_id, req.right_id).await?;

    tracing::info!(actor_id = auth.user.id, role_id, right_id = req.right_id, "right attached to role");
    Ok((
        StatusCode::CREATED,
        Json(RoleRight {
            role_id,
            right_id: req.right_id,
        }),
    ))
}

/// Detach a right from a role
#[utoipa::path(
    delete,
    path = "/rbac/roles/{role_id}/rights/{right_id}",
    tag = "RBAC",
    params(
        ("role_id" = i64, Path, description = "Role ID"),
        ("right_id" = i64, Path, description = "Right ID"),
    ),
    responses(
        (status = 204, description = "Right detached"),
        (status = 404, description = "Right not attached to role"),
    ),
    security(("tokenAuth" = []))
)]
pub async fn detach_right_from_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((role_id, right_id)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    require(&state, &auth, ResourceKind::Role, Action::Write).await?;

    let mut conn = state.pool.acquire().await?;
    registry::detach_right(&mut conn, role_id, right_id).await?;

    tracing::info!(actor_id = auth.user.id, role_id, right_id, "right detached from role");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// RIGHT ENDPOINTS
// =============================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct RightFilter {
    /// Only rights on this resource kind
    pub model: Option<ResourceKind>,
}

/// List right definitions
#[utoipa::path(
    get,
    path = "/rbac/rights",
    tag = "RBAC",
    params(RightFilter),
    responses(
        (status = 200, description = "List of rights", body = Vec<Right>),
    ),
    security(("tokenAuth" = []))
)]
pub async fn list_rights(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(filter): Query<RightFilter>,
) -> Result<Json<Vec<Right>>, AppError> {
    require(&state, &auth, ResourceKind::Right, Action::Read).await?;
    Ok(Json(registry::list_rights(&state.pool, filter.model).await?))
}

/// Define a new right
#[utoipa::path(
    post,
    path = "/rbac/rights",
    tag = "RBAC",
    request_body = RightCreateRequest,
    responses(
        (status = 201, description = "Right created", body = Right),
        (status = 409, description = "An identical right already exists"),
    ),
    security(("tokenAuth" = []))
)]
pub async fn create_right(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<RightCreateRequest>,
) -> Result<(StatusCode, Json<Right>), AppError> {
    require(&state, &auth, ResourceKind::Right, Action::Write).await?;

    let mut conn = state.pool.acquire().await?;
    let right = registry::create_right(&mut conn, req).await?;

    tracing::info!(
        actor_id = auth.user.id,
        right_id = right.id,
        model = %right.model,
        read = right.read,
        write = right.write,
        only_own = right.only_own,
        "right created"
    );
    Ok((StatusCode::CREATED, Json(right)))
}

// =============================================================================
// USER-ROLE ENDPOINTS
// =============================================================================

/// Get roles assigned to a user
#[utoipa::path(
    get,
    path = "/rbac/users/{user_id}/roles",
    tag = "RBAC",
    params(
        ("user_id" = i64, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "List of user roles", body = Vec<Role>),
    ),
    security(("tokenAuth" = []))
)]
pub async fn get_user_roles(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Role>>, AppError> {
    require(&state, &auth, ResourceKind::Role, Action::Read).await?;
    Ok(Json(registry::roles_for_user(&state.pool, user_id).await?))
}

/// Assign a role to a user
#[utoipa::path(
    post,
    path = "/rbac/users/{user_id}/roles",
    tag = "RBAC",
    params(
        ("user_id" = i64, Path, description = "User ID"),
    ),
    request_body = AssignRoleRequest,
    responses(
        (status = 201, description = "Role assigned", body = UserRole),
        (status = 404, description = "User or role not found"),
        (status = 409, description = "Role already assigned"),
    ),
    security(("tokenAuth" = []))
)]
pub async fn assign_role_to_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
    Json(req): Json<AssignRoleRequest>,
) -> Result<(StatusCode, Json<UserRole>), AppError> {
    require(&state, &auth, ResourceKind::Role, Action::Write).await?;

    let mut conn = state.pool.acquire().await?;
    registry::assign_role(&mut conn, user_id, req.role_id).await?;

    tracing::info!(actor_id = auth.user.id, user_id, role_id = req.role_id, "role assigned");
    Ok((
        StatusCode::CREATED,
        Json(UserRole {
            user_id,
            role_id: req.role_id,
        }),
    ))
}

/// Revoke a role from a user
#[utoipa::path(
    delete,
    path = "/rbac/users/{user_id}/roles/{role_id}",
    tag = "RBAC",
    params(
        ("user_id" = i64, Path, description = "User ID"),
        ("role_id" = i64, Path, description = "Role ID"),
    ),
    responses(
        (status = 204, description = "Role revoked"),
        (status = 404, description = "Role not assigned to user"),
    ),
    security(("tokenAuth" = []))
)]
pub async fn revoke_role_from_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((user_id, role_id)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    require(&state, &auth, ResourceKind::Role, Action::Write).await?;

    let mut conn = state.pool.acquire().await?;
    registry::revoke_role(&mut conn, user_id, role_id).await?;

    tracing::info!(actor_id = auth.user.id, user_id, role_id, "role revoked");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// EFFECTIVE RIGHTS
// =============================================================================

/// Union of all rights reachable through the user's roles
#[utoipa::path(
    get,
    path = "/rbac/users/{user_id}/rights",
    tag = "RBAC",
    params(
        ("user_id" = i64, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "Effective rights", body = EffectiveRights),
    ),
    security(("tokenAuth" = []))
)]
pub async fn get_effective_rights(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<EffectiveRights>, AppError> {
    require(&state, &auth, ResourceKind::Role, Action::Read).await?;

    let roles = registry::roles_for_user(&state.pool, user_id).await?;
    let rights = state.authz.rights_for(user_id).await?;

    Ok(Json(EffectiveRights {
        user_id,
        roles: roles.into_iter().map(|role| role.name).collect(),
        rights,
    }))
}
