use std::sync::Arc;

use super::store::AuthStore;
use super::{Protected, Target};
use crate::errors::{AppError, AppResult};
use crate::models::rbac::{Action, Right};
use crate::models::user::User;

/// Decide whether a set of rights covers `action` on `target` for `user_id`.
///
/// Rights are additive: one matching right is enough. A right with `only_own`
/// never matches an instance owned by someone else. Targets without an owner
/// (no instance, or a kind with no owner field) are not narrowed.
pub fn grants(rights: &[Right], user_id: i64, target: Target, action: Action) -> bool {
    let foreign = target.is_foreign_to(user_id);
    rights
        .iter()
        .filter(|right| right.model == target.kind)
        .filter(|right| right.allows(action))
        .any(|right| !(foreign && right.only_own))
}

/// Resolves allow/deny against the current role and right assignments.
///
/// Nothing is cached: every call re-reads the user's rights, so a revoked
/// role is honoured by the next check.
#[derive(Clone)]
pub struct AuthorizationEngine {
    store: Arc<dyn AuthStore>,
}

impl AuthorizationEngine {
    pub fn new(store: Arc<dyn AuthStore>) -> Self {
        Self { store }
    }

    pub async fn authorize(&self, user: &User, target: Target, action: Action) -> AppResult<bool> {
        let rights = self.store.rights_for_user(user.id).await?;
        let granted = grants(&rights, user.id, target, action);

        tracing::debug!(
            user_id = user.id,
            kind = %target.kind,
            action = %action,
            owner_id = ?target.owner_id,
            granted,
            "authorization decision"
        );

        Ok(granted)
    }

    /// Strict form of [`authorize`](Self::authorize): a denial is a `Forbidden` error.
    pub async fn require(&self, user: &User, target: Target, action: Action) -> AppResult<()> {
        if self.authorize(user, target, action).await? {
            Ok(())
        } else {
            Err(AppError::forbidden(format!("{} access to {} denied", action, target.kind)))
        }
    }

    pub async fn rights_for(&self, user_id: i64) -> AppResult<Vec<Right>> {
        self.store.rights_for_user(user_id).await
    }

    /// Keep only the items `user` may read, using a single rights lookup.
    pub async fn filter_readable<R: Protected>(&self, user: &User, items: Vec<R>) -> AppResult<Vec<R>> {
        let rights = self.store.rights_for_user(user.id).await?;
        let total = items.len();
        let visible: Vec<R> = items
            .into_iter()
            .filter(|item| grants(&rights, user.id, Target::instance(item), Action::Read))
            .collect();

        tracing::debug!(
            user_id = user.id,
            kind = %R::KIND,
            total,
            visible = visible.len(),
            "filtered readable items"
        );

        Ok(visible)
    }
}
