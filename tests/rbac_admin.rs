use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt;

use adboard::{create_app_with_config, seed, AuthConfig};

async fn setup() -> Result<(TempDir, SqlitePool, Router)> {
    let dir = tempdir().context("failed to create tempdir")?;
    let opts = SqliteConnectOptions::new()
        .filename(dir.path().join("rbac.db"))
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"))
        .await?;
    migrator.run(&pool).await?;

    let config = AuthConfig::default();
    seed::seed_default_role(&pool, &config).await?;
    let app = create_app_with_config(pool.clone(), config);
    Ok((dir, pool, app))
}

async fn call(app: &Router, method: &str, uri: &str, token: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let builder = Request::builder().method(method).uri(uri).header("x-token", token);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };
    let resp = app.clone().oneshot(req).await?;
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 1_048_576).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, value))
}

async fn sign_up(app: &Router, name: &str) -> Result<(i64, String)> {
    let creds = json!({ "name": name, "password": "password123" });

    let req = Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header("content-type", "application/json")
        .body(Body::from(creds.to_string()))?;
    let resp = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let user: Value = serde_json::from_slice(&body::to_bytes(resp.into_body(), 1_048_576).await?)?;

    let req = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(creds.to_string()))?;
    let resp = app.clone().oneshot(req).await?;
    let login: Value = serde_json::from_slice(&body::to_bytes(resp.into_body(), 1_048_576).await?)?;

    Ok((
        user["id"].as_i64().context("user id missing")?,
        login["token"].as_str().context("token missing")?.to_string(),
    ))
}

#[tokio::test]
async fn default_users_cannot_administer_roles() -> Result<()> {
    let (_dir, _pool, app) = setup().await?;
    let (user_id, token) = sign_up(&app, "plain").await?;

    let (status, _) = call(&app, "GET", "/rbac/roles", &token, None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, "POST", "/rbac/roles", &token, Some(json!({ "name": "sneaky" }))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app,
        "POST",
        "/rbac/rights",
        &token,
        Some(json!({ "model": "advertisement", "read": true, "write": true, "only_own": false })),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, "GET", &format!("/rbac/users/{user_id}/rights"), &token, None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn role_changes_apply_on_next_request() -> Result<()> {
    let (_dir, pool, app) = setup().await?;
    let (_alice_id, alice) = sign_up(&app, "alice").await?;
    let (bob_id, bob) = sign_up(&app, "bob").await?;
    seed::grant_admin(&pool, "alice").await?;

    let (status, ad) = call(
        &app,
        "POST",
        "/advertisements",
        &alice,
        Some(json!({ "title": "Desk", "price": 40 })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let ad_uri = format!("/advertisements/{}", ad["id"]);

    let (status, _) = call(&app, "GET", &ad_uri, &bob, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Admin builds a "reader" role with a public read right on advertisements
    let (status, right) = call(
        &app,
        "POST",
        "/rbac/rights",
        &alice,
        Some(json!({ "model": "advertisement", "read": true, "write": false, "only_own": false })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let right_id = right["id"].as_i64().context("right id missing")?;

    let (status, body) = call(
        &app,
        "POST",
        "/rbac/rights",
        &alice,
        Some(json!({ "model": "advertisement", "read": true, "write": false, "only_own": false })),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT, "identical right must be rejected: {body}");

    let (status, role) = call(&app, "POST", "/rbac/roles", &alice, Some(json!({ "name": "reader" }))).await?;
    assert_eq!(status, StatusCode::CREATED);
    let role_id = role["id"].as_i64().context("role id missing")?;

    let (status, _) = call(&app, "POST", "/rbac/roles", &alice, Some(json!({ "name": "reader" }))).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let attach_uri = format!("/rbac/roles/{role_id}/rights");
    let (status, _) = call(&app, "POST", &attach_uri, &alice, Some(json!({ "right_id": right_id }))).await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = call(&app, "POST", &attach_uri, &alice, Some(json!({ "right_id": right_id }))).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, detail) = call(&app, "GET", &format!("/rbac/roles/{role_id}"), &alice, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["name"], "reader");
    assert_eq!(detail["rights"].as_array().map(Vec::len), Some(1));

    // Assign to Bob; his very next request sees the new right
    let (status, _) = call(
        &app,
        "POST",
        &format!("/rbac/users/{bob_id}/roles"),
        &alice,
        Some(json!({ "role_id": role_id })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, seen) = call(&app, "GET", &ad_uri, &bob, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(seen["title"], "Desk");

    // Reading is all the reader role gives
    let (status, _) = call(&app, "DELETE", &ad_uri, &bob, None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, effective) = call(&app, "GET", &format!("/rbac/users/{bob_id}/rights"), &alice, None).await?;
    assert_eq!(status, StatusCode::OK);
    let roles: Vec<&str> = effective["roles"]
        .as_array()
        .context("roles missing")?
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(roles.contains(&"user") && roles.contains(&"reader"), "got {roles:?}");
    assert_eq!(effective["rights"].as_array().map(Vec::len), Some(5));

    let (status, _) = call(&app, "DELETE", &format!("/rbac/users/{bob_id}/roles/{role_id}"), &alice, None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, "DELETE", &format!("/rbac/users/{bob_id}/roles/{role_id}"), &alice, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "GET", &ad_uri, &bob, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Detach and delete clean up the registry
    let (status, _) = call(&app, "DELETE", &format!("/rbac/roles/{role_id}/rights/{right_id}"), &alice, None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, "DELETE", &format!("/rbac/roles/{role_id}/rights/{right_id}"), &alice, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "DELETE", &format!("/rbac/roles/{role_id}"), &alice, None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, "GET", &format!("/rbac/roles/{role_id}"), &alice, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn rights_can_be_listed_by_model() -> Result<()> {
    let (_dir, pool, app) = setup().await?;
    let (_id, admin) = sign_up(&app, "root").await?;
    seed::grant_admin(&pool, "root").await?;

    let (status, all) = call(&app, "GET", "/rbac/rights", &admin, None).await?;
    assert_eq!(status, StatusCode::OK);
    // four seeded rights plus one admin right per kind
    assert_eq!(all.as_array().map(Vec::len), Some(8));

    let (status, ads) = call(&app, "GET", "/rbac/rights?model=advertisement", &admin, None).await?;
    assert_eq!(status, StatusCode::OK);
    let ads = ads.as_array().context("expected array")?;
    assert_eq!(ads.len(), 3);
    assert!(ads.iter().all(|r| r["model"] == "advertisement"));

    let (status, roles) = call(&app, "GET", "/rbac/roles", &admin, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(roles.as_array().map(Vec::len), Some(2));

    Ok(())
}
