use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::authz::Protected;

// =============================================================================
// RESOURCE KIND
// =============================================================================

/// Every resource kind a right can be granted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ResourceKind {
    Advertisement,
    User,
    Role,
    Right,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Advertisement,
        ResourceKind::User,
        ResourceKind::Role,
        ResourceKind::Right,
    ];

    /// Kinds whose instances carry an owner and therefore get the default seed.
    pub const OWNED: [ResourceKind; 2] = [ResourceKind::Advertisement, ResourceKind::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Advertisement => "advertisement",
            ResourceKind::User => "user",
            ResourceKind::Role => "role",
            ResourceKind::Right => "right",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ACTION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Write,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Read => f.write_str("read"),
            Action::Write => f.write_str("write"),
        }
    }
}

// =============================================================================
// ROLE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Role {
    pub id: i64,
    pub name: String,
}

impl Protected for Role {
    const KIND: ResourceKind = ResourceKind::Role;

    fn owner_id(&self) -> Option<i64> {
        None
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleCreateRequest {
    #[schema(example = "moderator")]
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleWithRights {
    #[serde(flatten)]
    pub role: Role,
    pub rights: Vec<Right>,
}

// =============================================================================
// RIGHT
// =============================================================================

/// A single grant: which kind, which actions, and whether only on the caller's own resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Right {
    pub id: i64,
    pub model: ResourceKind,
    pub read: bool,
    pub write: bool,
    pub only_own: bool,
}

impl Right {
    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::Read => self.read,
            Action::Write => self.write,
        }
    }
}

impl Protected for Right {
    const KIND: ResourceKind = ResourceKind::Right;

    fn owner_id(&self) -> Option<i64> {
        None
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct RightCreateRequest {
    pub model: ResourceKind,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub write: bool,
    #[serde(default = "default_only_own")]
    pub only_own: bool,
}

fn default_only_own() -> bool {
    true
}

// =============================================================================
// JOIN ENTITIES
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RoleRight {
    pub role_id: i64,
    pub right_id: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AttachRightRequest {
    pub right_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserRole {
    pub user_id: i64,
    pub role_id: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignRoleRequest {
    pub role_id: i64,
}

// =============================================================================
// EFFECTIVE RIGHTS (computed)
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct EffectiveRights {
    pub user_id: i64,
    pub roles: Vec<String>,
    pub rights: Vec<Right>,
}
