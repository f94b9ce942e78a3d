use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::authz::Protected;
use crate::models::rbac::ResourceKind;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Advertisement {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub date_create: DateTime<Utc>,
    pub user_id: i64,
}

impl Protected for Advertisement {
    const KIND: ResourceKind = ResourceKind::Advertisement;

    fn owner_id(&self) -> Option<i64> {
        Some(self.user_id)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdvertisementCreateRequest {
    #[schema(example = "Vintage bicycle")]
    pub title: String,
    #[schema(example = "Steel frame, new tyres.")]
    #[serde(default)]
    pub description: String,
    #[schema(example = 120)]
    pub price: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdvertisementUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AdvertisementFilter {
    /// Exact title match
    pub title: Option<String>,
}
