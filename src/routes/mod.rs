use serde::Serialize;
use utoipa::ToSchema;

pub mod advertisements;
pub mod auth;
pub mod health;
pub mod rbac;
pub mod users;

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
