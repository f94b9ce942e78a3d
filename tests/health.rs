use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::tempdir;
use tower::util::ServiceExt; // for `oneshot`

use adboard::{create_app_with_config, seed, AuthConfig};

async fn get_health(app: axum::Router) -> Result<Value> {
    let req = Request::builder()
        .method("GET")
        .uri("/api/health")
        .body(Body::empty())?;

    let resp: Response = app.oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK, "health endpoint did not return 200");

    let body_bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    Ok(serde_json::from_slice(&body_bytes)?)
}

#[tokio::test]
async fn health_endpoint_reports_seeding_state() -> Result<()> {
    // create temp dir and sqlite db
    let dir = tempdir()?;
    let db_path = dir.path().join("test.db");

    use sqlx::sqlite::SqliteConnectOptions;
    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePool::connect_with(opts).await?;

    // run migrations
    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")).await?;
    migrator.run(&pool).await?;

    let config = AuthConfig::default();
    let app = create_app_with_config(pool.clone(), config.clone());

    let v = get_health(app.clone()).await?;
    assert_eq!(v["db_ok"], true, "expected db_ok: true, got: {}", v);
    assert_eq!(v["default_role_seeded"], false);
    assert_eq!(v["status"], "unseeded");
    assert!(v.get("db_error").is_none());

    seed::seed_default_role(&pool, &config).await?;

    let v = get_health(app).await?;
    assert_eq!(v["default_role_seeded"], true);
    assert_eq!(v["status"], "ok");

    Ok(())
}
