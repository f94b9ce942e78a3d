//! Authorization core
//!
//! - Opaque login tokens resolved against a fixed TTL window
//! - Role -> right reachability through explicit join tables
//! - Per-kind read/write checks with own-only narrowing on instances
//!
//! The engine and the token validator both take an injected [`AuthStore`];
//! nothing here holds a global connection.

mod evaluator;
mod store;
mod tokens;

pub use evaluator::{grants, AuthorizationEngine};
pub use store::{AuthStore, SqliteAuthStore};
pub use tokens::{issue_token, IssuedToken, TokenValidator};

#[cfg(test)]
pub(crate) use store::memory::MemoryStore;

use crate::models::rbac::ResourceKind;

/// Static mapping from a resource type to its kind and owner field.
///
/// Types without an owner field return `None`, which disables own-only narrowing.
pub trait Protected {
    const KIND: ResourceKind;

    fn owner_id(&self) -> Option<i64>;
}

/// What an authorization check is about: a kind, and optionally the owner of a concrete instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub kind: ResourceKind,
    pub owner_id: Option<i64>,
}

impl Target {
    /// The kind as a whole, with no instance to narrow on.
    pub fn kind(kind: ResourceKind) -> Self {
        Self { kind, owner_id: None }
    }

    pub fn instance<R: Protected>(resource: &R) -> Self {
        Self {
            kind: R::KIND,
            owner_id: resource.owner_id(),
        }
    }

    /// An instance that does not exist yet but will be owned by `owner_id`.
    pub fn owned_by(kind: ResourceKind, owner_id: i64) -> Self {
        Self {
            kind,
            owner_id: Some(owner_id),
        }
    }

    pub fn is_foreign_to(&self, user_id: i64) -> bool {
        matches!(self.owner_id, Some(owner) if owner != user_id)
    }
}
