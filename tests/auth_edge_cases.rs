use anyhow::Context;
use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt;

use adboard::{create_app_with_config, seed, AuthConfig};

async fn setup(seeded: bool) -> Result<(TempDir, SqlitePool, Router)> {
    let dir = tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test_auth.db");
    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"))
        .await?;
    migrator.run(&pool).await?;

    let config = AuthConfig::default();
    if seeded {
        seed::seed_default_role(&pool, &config).await?;
    }
    let app = create_app_with_config(pool.clone(), config);
    Ok((dir, pool, app))
}

async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("x-token", token);
    }
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };
    let resp: Response = app.clone().oneshot(req).await?;
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 1_048_576).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, value))
}

async fn register_and_login(app: &Router, name: &str) -> Result<String> {
    let creds = json!({ "name": name, "password": "password123" });
    let (status, _) = send(app, "POST", "/auth/register", None, Some(creds.clone())).await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(app, "POST", "/auth/login", None, Some(creds)).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(body["token"].as_str().context("token missing")?.to_string())
}

#[tokio::test]
async fn auth_edge_cases() -> Result<()> {
    let (_dir, _pool, app) = setup(true).await?;

    // 1. Register with short password
    let (status, _) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "name": "Short Pass", "password": "short" })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "Should fail with bad request for short password");

    // 2. Register with valid user
    let (status, user) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "name": "valid", "password": "password123" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["name"], "valid");
    assert!(user.get("password_hash").is_none());

    // 3. Same name again
    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "name": "valid", "password": "password456" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    // 4. Login with wrong password
    let (status, _) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "name": "valid", "password": "wrongpassword" })),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "Should fail with unauthorized for wrong password");

    // 5. Login with unknown name
    let (status, _) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "name": "nobody", "password": "password123" })),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "Should fail with unauthorized for non-existent user");

    // 6. Protected route without token or with garbage
    let (status, _) = send(&app, "GET", "/advertisements", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "Should fail with unauthorized for missing token");
    let (status, _) = send(&app, "GET", "/advertisements", Some("not-a-token"), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn login_token_identifies_user_until_logout() -> Result<()> {
    let (_dir, _pool, app) = setup(true).await?;
    let token = register_and_login(&app, "carol").await?;

    let (status, me) = send(&app, "GET", "/auth/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "carol");

    // Bearer header works as a fallback
    let req = Request::builder()
        .method("GET")
        .uri("/auth/me")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, _) = send(&app, "POST", "/auth/logout", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/auth/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    Ok(())
}

#[tokio::test]
async fn expired_token_is_rejected() -> Result<()> {
    let (_dir, pool, app) = setup(true).await?;
    let token = register_and_login(&app, "dave").await?;

    // Just inside the window
    sqlx::query("UPDATE tokens SET creation_time = ?")
        .bind(Utc::now() - Duration::seconds(3500))
        .execute(&pool)
        .await?;
    let (status, _) = send(&app, "GET", "/auth/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);

    // Past the default hour
    sqlx::query("UPDATE tokens SET creation_time = ?")
        .bind(Utc::now() - Duration::seconds(3700))
        .execute(&pool)
        .await?;
    let (status, _) = send(&app, "GET", "/auth/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A fresh login gets a new, valid token
    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "name": "dave", "password": "password123" })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let fresh = body["token"].as_str().context("token missing")?;
    assert_ne!(fresh, token);
    let expires_at: chrono::DateTime<Utc> = serde_json::from_value(body["expires_at"].clone())?;
    let remaining = expires_at - Utc::now();
    assert!(
        remaining > Duration::seconds(3500) && remaining <= Duration::seconds(3600),
        "expires_at should be one TTL after login, got {expires_at}"
    );
    let (status, _) = send(&app, "GET", "/auth/me", Some(fresh), None).await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn register_requires_seeded_default_role() -> Result<()> {
    let (_dir, pool, app) = setup(false).await?;

    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "name": "early", "password": "password123" })),
    )
    .await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "configuration");

    let users: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users").fetch_one(&pool).await?;
    assert_eq!(users, 0, "failed registration must not leave a user behind");

    Ok(())
}
