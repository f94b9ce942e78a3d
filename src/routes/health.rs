use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app::AppState;
use crate::errors::AppResult;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub db_ok: bool,
    /// Registration fails until the default role exists.
    pub default_role_seeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_error: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses((status = 200, description = "Health check", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let seeded = sqlx::query_scalar::<_, i64>("SELECT COUNT(1) FROM roles WHERE name = ?")
        .bind(&state.config.default_role)
        .fetch_one(&state.pool)
        .await;

    let response = match seeded {
        Ok(count) => HealthResponse {
            status: if count > 0 { "ok" } else { "unseeded" },
            db_ok: true,
            default_role_seeded: count > 0,
            db_error: None,
        },
        Err(e) => HealthResponse {
            status: "degraded",
            db_ok: false,
            default_role_seeded: false,
            db_error: Some(e.to_string()),
        },
    };

    Ok(Json(response))
}
