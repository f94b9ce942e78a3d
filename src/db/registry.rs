//! Role and right registry queries.
//!
//! Mutations take a `&mut SqliteConnection` so they can run on a pooled
//! connection or inside a transaction (`&mut *tx`).

use sqlx::{SqliteConnection, SqlitePool};

use crate::errors::{AppError, AppResult};
use crate::models::rbac::{ResourceKind, Right, RightCreateRequest, Role};

// =============================================================================
// ROLES
// =============================================================================

pub async fn create_role(conn: &mut SqliteConnection, name: &str) -> AppResult<Role> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("role name must not be empty"));
    }

    let id = sqlx::query("INSERT INTO roles (name) VALUES (?)")
        .bind(name)
        .execute(&mut *conn)
        .await
        .map_err(|err| match AppError::from(err) {
            AppError::Conflict(_) => AppError::conflict(format!("role '{name}' already exists")),
            other => other,
        })?
        .last_insert_rowid();

    Ok(Role {
        id,
        name: name.to_string(),
    })
}

pub async fn list_roles(pool: &SqlitePool) -> AppResult<Vec<Role>> {
    let roles = sqlx::query_as::<_, Role>("SELECT id, name FROM roles ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(roles)
}

pub async fn find_role(conn: &mut SqliteConnection, role_id: i64) -> AppResult<Role> {
    sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE id = ?")
        .bind(role_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("role not found"))
}

pub async fn find_role_by_name(conn: &mut SqliteConnection, name: &str) -> AppResult<Option<Role>> {
    let role = sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(role)
}

/// Delete a role. Its right and user assignments go with it.
pub async fn delete_role(conn: &mut SqliteConnection, role_id: i64) -> AppResult<Role> {
    let role = find_role(conn, role_id).await?;

    sqlx::query("DELETE FROM roles WHERE id = ?")
        .bind(role_id)
        .execute(&mut *conn)
        .await?;

    Ok(role)
}

// =============================================================================
// RIGHTS
// =============================================================================

pub async fn create_right(conn: &mut SqliteConnection, req: RightCreateRequest) -> AppResult<Right> {
    let id = sqlx::query("INSERT INTO rights (model, read, write, only_own) VALUES (?, ?, ?, ?)")
        .bind(req.model)
        .bind(req.read)
        .bind(req.write)
        .bind(req.only_own)
        .execute(&mut *conn)
        .await
        .map_err(|err| match AppError::from(err) {
            AppError::Conflict(_) => AppError::conflict(format!(
                "right (model={}, only_own={}, read={}, write={}) already exists",
                req.model, req.only_own, req.read, req.write
            )),
            other => other,
        })?
        .last_insert_rowid();

    Ok(Right {
        id,
        model: req.model,
        read: req.read,
        write: req.write,
        only_own: req.only_own,
    })
}

/// Return the right with exactly this tuple, creating it when absent.
pub async fn find_or_create_right(conn: &mut SqliteConnection, req: RightCreateRequest) -> AppResult<Right> {
    let existing = sqlx::query_as::<_, Right>(
        "SELECT id, model, read, write, only_own FROM rights WHERE model = ? AND only_own = ? AND read = ? AND write = ?",
    )
    .bind(req.model)
    .bind(req.only_own)
    .bind(req.read)
    .bind(req.write)
    .fetch_optional(&mut *conn)
    .await?;

    match existing {
        Some(right) => Ok(right),
        None => create_right(conn, req).await,
    }
}

pub async fn list_rights(pool: &SqlitePool, model: Option<ResourceKind>) -> AppResult<Vec<Right>> {
    let rights = match model {
        Some(model) => {
            sqlx::query_as::<_, Right>(
                "SELECT id, model, read, write, only_own FROM rights WHERE model = ? ORDER BY id",
            )
            .bind(model)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Right>("SELECT id, model, read, write, only_own FROM rights ORDER BY id")
                .fetch_all(pool)
                .await?
        }
    };
    Ok(rights)
}

pub async fn find_right(conn: &mut SqliteConnection, right_id: i64) -> AppResult<Right> {
    sqlx::query_as::<_, Right>("SELECT id, model, read, write, only_own FROM rights WHERE id = ?")
        .bind(right_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("right not found"))
}

pub async fn rights_for_role(pool: &SqlitePool, role_id: i64) -> AppResult<Vec<Right>> {
    let rights = sqlx::query_as::<_, Right>(
        r#"
        SELECT r.id, r.model, r.read, r.write, r.only_own
        FROM rights r
        INNER JOIN role_rights rr ON rr.right_id = r.id
        WHERE rr.role_id = ?
        ORDER BY r.id
        "#,
    )
    .bind(role_id)
    .fetch_all(pool)
    .await?;
    Ok(rights)
}

// =============================================================================
// ROLE <-> RIGHT
// =============================================================================

pub async fn attach_right(conn: &mut SqliteConnection, role_id: i64, right_id: i64) -> AppResult<()> {
    find_role(conn, role_id).await?;
    find_right(conn, right_id).await?;

    let attached: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM role_rights WHERE role_id = ? AND right_id = ?")
        .bind(role_id)
        .bind(right_id)
        .fetch_one(&mut *conn)
        .await?;
    if attached > 0 {
        return Err(AppError::conflict("right already attached to role"));
    }

    sqlx::query("INSERT INTO role_rights (role_id, right_id) VALUES (?, ?)")
        .bind(role_id)
        .bind(right_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn detach_right(conn: &mut SqliteConnection, role_id: i64, right_id: i64) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM role_rights WHERE role_id = ? AND right_id = ?")
        .bind(role_id)
        .bind(right_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("right is not attached to role"));
    }
    Ok(())
}

// =============================================================================
// USER <-> ROLE
// =============================================================================

pub async fn assign_role(conn: &mut SqliteConnection, user_id: i64, role_id: i64) -> AppResult<()> {
    let user_exists: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    if user_exists == 0 {
        return Err(AppError::not_found("user not found"));
    }
    find_role(conn, role_id).await?;

    let assigned: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM user_roles WHERE user_id = ? AND role_id = ?")
        .bind(user_id)
        .bind(role_id)
        .fetch_one(&mut *conn)
        .await?;
    if assigned > 0 {
        return Err(AppError::conflict("role already assigned to user"));
    }

    sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(role_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn revoke_role(conn: &mut SqliteConnection, user_id: i64, role_id: i64) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM user_roles WHERE user_id = ? AND role_id = ?")
        .bind(user_id)
        .bind(role_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("role is not assigned to user"));
    }
    Ok(())
}

pub async fn roles_for_user(pool: &SqlitePool, user_id: i64) -> AppResult<Vec<Role>> {
    let roles = sqlx::query_as::<_, Role>(
        r#"
        SELECT r.id, r.name
        FROM roles r
        INNER JOIN user_roles ur ON ur.role_id = r.id
        WHERE ur.user_id = ?
        ORDER BY r.name
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(roles)
}
