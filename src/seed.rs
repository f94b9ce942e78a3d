//! Role bootstrap: the default role every new user gets, and an admin role.

use sqlx::SqlitePool;

use crate::config::AuthConfig;
use crate::db::registry;
use crate::errors::{AppError, AppResult};
use crate::models::rbac::{ResourceKind, RightCreateRequest, Role, RoleWithRights};

pub const ADMIN_ROLE: &str = "admin";

/// Rights of the default role: for each owned kind one read right and one
/// own-only write right.
pub fn default_rights(read_only_own: bool) -> Vec<RightCreateRequest> {
    let mut rights = Vec::new();
    for read in [true, false] {
        for model in ResourceKind::OWNED {
            rights.push(RightCreateRequest {
                model,
                read,
                write: !read,
                only_own: if read { read_only_own } else { true },
            });
        }
    }
    rights
}

/// Create the default role and its rights in one transaction.
///
/// A pre-existing role or right with the same identity is a `Conflict`;
/// nothing is written in that case.
pub async fn seed_default_role(pool: &SqlitePool, config: &AuthConfig) -> AppResult<RoleWithRights> {
    let mut tx = pool.begin().await?;

    let role = registry::create_role(&mut tx, &config.default_role).await?;
    let mut rights = Vec::new();
    for req in default_rights(config.seed_read_only_own) {
        let right = registry::create_right(&mut tx, req).await?;
        registry::attach_right(&mut tx, role.id, right.id).await?;
        rights.push(right);
    }

    tx.commit().await?;

    tracing::info!(
        role = %role.name,
        rights = rights.len(),
        read_only_own = config.seed_read_only_own,
        "seeded default role"
    );

    Ok(RoleWithRights { role, rights })
}

/// Seed the default role unless a role with that name already exists.
pub async fn ensure_default_role(pool: &SqlitePool, config: &AuthConfig) -> AppResult<Role> {
    let mut conn = pool.acquire().await?;
    if let Some(role) = registry::find_role_by_name(&mut conn, &config.default_role).await? {
        return Ok(role);
    }
    drop(conn);

    Ok(seed_default_role(pool, config).await?.role)
}

/// Give `user_name` the admin role: read and write on every kind, regardless of owner.
pub async fn grant_admin(pool: &SqlitePool, user_name: &str) -> AppResult<Role> {
    let mut tx = pool.begin().await?;

    let user_id: i64 = sqlx::query_scalar("SELECT id FROM users WHERE name = ?")
        .bind(user_name)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user '{user_name}' not found")))?;

    let role = match registry::find_role_by_name(&mut tx, ADMIN_ROLE).await? {
        Some(role) => role,
        None => {
            let role = registry::create_role(&mut tx, ADMIN_ROLE).await?;
            for model in ResourceKind::ALL {
                let right = registry::find_or_create_right(
                    &mut tx,
                    RightCreateRequest {
                        model,
                        read: true,
                        write: true,
                        only_own: false,
                    },
                )
                .await?;
                registry::attach_right(&mut tx, role.id, right.id).await?;
            }
            role
        }
    };

    registry::assign_role(&mut tx, user_id, role.id).await?;
    tx.commit().await?;

    tracing::info!(user = %user_name, role = %role.name, "granted admin role");
    Ok(role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rights_shape() {
        let rights = default_rights(true);
        assert_eq!(rights.len(), 4);
        assert!(rights.iter().all(|r| r.only_own));
        assert!(rights.iter().all(|r| r.read != r.write));
        for model in ResourceKind::OWNED {
            assert!(rights.iter().any(|r| r.model == model && r.read));
            assert!(rights.iter().any(|r| r.model == model && r.write));
        }
    }

    #[test]
    fn test_public_read_keeps_writes_own_only() {
        let rights = default_rights(false);
        for r in &rights {
            if r.read {
                assert!(!r.only_own);
            } else {
                assert!(r.only_own);
            }
        }
    }
}
