use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{AuthStore, AuthorizationEngine, SqliteAuthStore, TokenValidator};
use crate::config::AuthConfig;
use crate::errors::AppError;
use crate::routes::{advertisements, auth, health, rbac, users};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<AuthConfig>,
    pub tokens: TokenValidator,
    pub authz: AuthorizationEngine,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: AuthConfig) -> Self {
        let store: Arc<dyn AuthStore> = Arc::new(SqliteAuthStore::new(pool.clone()));
        Self {
            tokens: TokenValidator::new(store.clone(), config.token_ttl),
            authz: AuthorizationEngine::new(store),
            config: Arc::new(config),
            pool,
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let config = AuthConfig::from_env()?;
    Ok(create_app_with_config(pool, config))
}

pub fn create_app_with_config(pool: SqlitePool, config: AuthConfig) -> Router {
    let state = AppState::new(pool, config);

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout));

    let advertisement_routes = Router::new()
        .route(
            "/",
            get(advertisements::list_advertisements).post(advertisements::create_advertisement),
        )
        .route(
            "/:id",
            get(advertisements::get_advertisement)
                .patch(advertisements::update_advertisement)
                .delete(advertisements::delete_advertisement),
        );

    let user_routes = Router::new().route(
        "/:id",
        get(users::get_user)
            .patch(users::update_user)
            .delete(users::delete_user),
    );

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/auth", auth_routes)
        .nest("/advertisements", advertisement_routes)
        .nest("/users", user_routes)
        .nest("/rbac", rbac::routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
