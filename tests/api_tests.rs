//! HTTP API tests. Handlers are driven through the router with `oneshot`,
//! no socket binding, against a real SQLite database in a temp directory.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

use biocat::config::Config;
use biocat::insect::InsectRecord;
use biocat::plant::PlantRecord;
use biocat::server::{build_router, AppState};
use biocat::{db, migrate, store};

async fn test_app() -> (Router, SqlitePool, TempDir) {
    let dir = TempDir::new().unwrap();
    let mut config = Config::minimal();
    config.db.path = dir.path().join("test.sqlite");

    let pool = db::connect(&config).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();

    let app = build_router(AppState {
        config: Arc::new(config),
        pool: pool.clone(),
    });
    (app, pool, dir)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_form(app: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn seed_plant(pool: &SqlitePool, name: &str, family: &str) -> i64 {
    let raw: HashMap<String, String> = [
        ("scientificName", name),
        ("family", family),
        ("country", "China"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    store::insert_plant(pool, &PlantRecord::from_external(&raw))
        .await
        .unwrap()
}

async fn seed_insect(pool: &SqlitePool, name: &str, province: &str, collected: &str) -> i64 {
    let raw: HashMap<String, String> = [
        ("chineseName", name),
        ("familyName", "Apidae"),
        ("province", province),
        ("collectionDate", collected),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    store::insert_insect(pool, &InsectRecord::from_external(&raw))
        .await
        .unwrap()
}

#[tokio::test]
async fn health_reports_version() {
    let (app, _pool, _dir) = test_app().await;
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn stats_count_both_tables() {
    let (app, pool, _dir) = test_app().await;
    seed_plant(&pool, "Rosa rugosa", "Rosaceae").await;
    seed_plant(&pool, "Rosa chinensis", "Rosaceae").await;

    let (status, body) = get(&app, "/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plant_count"], 2);
    assert_eq!(body["insect_count"], 0);
    assert_eq!(body["total_count"], 2);
    assert_eq!(body["family_count"], 1);
}

#[tokio::test]
async fn plant_list_pages_and_filters() {
    let (app, pool, _dir) = test_app().await;
    seed_plant(&pool, "Rosa rugosa", "Rosaceae").await;
    seed_plant(&pool, "Rosa chinensis", "Rosaceae").await;
    seed_plant(&pool, "Bambusa multiplex", "Poaceae").await;

    let (status, body) = get(&app, "/plants").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 3);
    assert_eq!(body["page"], 1);
    assert_eq!(body["total"], 3);
    assert_eq!(body["total_pages"], 1);
    assert_eq!(
        body["filters"]["families"],
        serde_json::json!(["Poaceae", "Rosaceae"])
    );
    // External representation is camelCase
    assert!(body["items"][0]["scientificName"].is_string());

    let (_, filtered) = get(&app, "/plants?family=Poaceae").await;
    assert_eq!(filtered["total"], 1);
    assert_eq!(filtered["items"][0]["scientificName"], "Bambusa multiplex");

    let (_, searched) = get(&app, "/plants?q=chinensis").await;
    assert_eq!(searched["total"], 1);
}

#[tokio::test]
async fn plant_detail_and_missing_id() {
    let (app, pool, _dir) = test_app().await;
    let id = seed_plant(&pool, "Rosa rugosa", "Rosaceae").await;

    let (status, body) = get(&app, &format!("/plants/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scientificName"], "Rosa rugosa");

    let (status, body) = get(&app, "/plants/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn plant_create_edit_delete_cycle() {
    let (app, _pool, _dir) = test_app().await;

    let (status, body) = post_form(
        &app,
        "/plants/add",
        "scientificName=Rosa+rugosa&family=Rosaceae&identificationID=ICN100&decimalLatitude=25.1",
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "created");
    let id = body["id"].as_i64().unwrap();

    let (_, detail) = get(&app, &format!("/plants/{id}")).await;
    assert_eq!(detail["scientificName"], "Rosa rugosa");
    assert_eq!(detail["identificationID"], "ICN100");
    assert_eq!(detail["decimalLatitude"], 25.1);
    // Timestamps keep their historical snake_case keys
    assert!(detail["created_at"].is_string());
    assert!(detail.get("createdAt").is_none());

    let (status, body) =
        post_form(&app, &format!("/plants/{id}/edit"), "family=Poaceae").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "updated");

    let (_, edited) = get(&app, &format!("/plants/{id}")).await;
    assert_eq!(edited["family"], "Poaceae");
    // Untouched fields survive a partial edit
    assert_eq!(edited["scientificName"], "Rosa rugosa");

    let (status, _) = post_form(&app, &format!("/plants/{id}/delete"), "").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&app, &format!("/plants/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = post_form(&app, &format!("/plants/{id}/delete"), "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn insect_create_normalizes_fields() {
    let (app, _pool, _dir) = test_app().await;

    let (status, body) = post_form(
        &app,
        "/insects/add",
        "serialNumber=INS100&class=Insecta&order=Hymenoptera&collectionDate=2023-07&longitude=102.71",
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_i64().unwrap();

    let (_, detail) = get(&app, &format!("/insects/{id}")).await;
    assert_eq!(detail["serialNumber"], "INS100");
    assert_eq!(detail["class"], "Insecta");
    assert_eq!(detail["order"], "Hymenoptera");
    // Month precision resolves to the first of the month
    assert_eq!(detail["collectionDate"], "2023-07-01");
    assert_eq!(detail["longitude"], 102.71);
    // Insect timestamps are camelCase, unlike plants
    assert!(detail["createdAt"].is_string());
}

#[tokio::test]
async fn insect_list_filters_by_collection_date_range() {
    let (app, pool, _dir) = test_app().await;
    seed_insect(&pool, "Bee A", "Yunnan", "2023-05-01").await;
    seed_insect(&pool, "Bee B", "Yunnan", "2023-06-15").await;
    seed_insect(&pool, "Bee C", "Sichuan", "2023-07-20").await;

    let (status, body) = get(
        &app,
        "/insects?collection_date_start=2023-06-01&collection_date_end=2023-06-30",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["chineseName"], "Bee B");

    // Open-ended range
    let (_, body) = get(&app, "/insects?collection_date_start=2023-06-01").await;
    assert_eq!(body["total"], 2);

    // Bounds combine with the other filters
    let (_, body) = get(
        &app,
        "/insects?province=Sichuan&collection_date_start=2023-06-01",
    )
    .await;
    assert_eq!(body["total"], 1);

    // An unparseable bound is ignored, not an error
    let (status, body) = get(&app, "/insects?collection_date_start=not-a-date").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn api_insect_search_accepts_date_bounds() {
    let (app, pool, _dir) = test_app().await;
    seed_insect(&pool, "Bee A", "Yunnan", "2023-05-01").await;
    seed_insect(&pool, "Bee B", "Yunnan", "2023-06-15").await;

    let (status, body) = get(
        &app,
        "/api/insects/search?province=Yunnan&collection_date_start=2023-06-01",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["chineseName"], "Bee B");
}

#[tokio::test]
async fn api_search_combines_query_and_filters() {
    let (app, pool, _dir) = test_app().await;
    seed_plant(&pool, "Rosa rugosa", "Rosaceae").await;
    seed_plant(&pool, "Rosa chinensis", "Rosaceae").await;
    seed_plant(&pool, "Bambusa multiplex", "Poaceae").await;

    let (status, body) = get(&app, "/api/plants/search?q=rugosa").await;
    assert_eq!(status, StatusCode::OK);
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["scientificName"], "Rosa rugosa");

    // Free-text query and equality filter intersect
    let (status, body) = get(&app, "/api/plants/search?q=Rosa&family=Rosaceae").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = get(&app, "/api/plants/search?q=Rosa&family=Poaceae").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn api_search_filters_work_without_query() {
    let (app, pool, _dir) = test_app().await;
    seed_plant(&pool, "Rosa rugosa", "Rosaceae").await;
    seed_plant(&pool, "Bambusa multiplex", "Poaceae").await;

    // No free-text predicate at all
    let (status, body) = get(&app, "/api/plants/search?family=Poaceae").await;
    assert_eq!(status, StatusCode::OK);
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["scientificName"], "Bambusa multiplex");

    // A blank q means the same as an absent one
    let (status, body) = get(&app, "/api/plants/search?q=&family=Poaceae").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    // Unfiltered search returns everything up to the cap
    let (status, body) = get(&app, "/api/plants/search").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn api_lists_serve_external_representation() {
    let (app, pool, _dir) = test_app().await;
    seed_plant(&pool, "Rosa rugosa", "Rosaceae").await;

    let (status, body) = get(&app, "/api/plants").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["scientificName"], "Rosa rugosa");

    let (status, body) = get(&app, "/api/insects").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn admin_login_rejects_bad_credentials() {
    let (app, _pool, _dir) = test_app().await;
    let (status, body) =
        post_form(&app, "/admin/login", "username=admin&password=wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn admin_session_cookie_round_trip() {
    let (app, _pool, _dir) = test_app().await;

    // Default development credentials
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("username=admin&password=dev-admin-password"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("biocat_admin="));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/admin/session")
                .header(header::COOKIE, cookie.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["is_admin"], true);

    // A tampered token is not a session
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/admin/session")
                .header(header::COOKIE, "biocat_admin=deadbeef")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["is_admin"], false);

    // No cookie at all
    let (_, body) = get(&app, "/admin/session").await;
    assert_eq!(body["is_admin"], false);
}

#[tokio::test]
async fn admin_logout_expires_cookie() {
    let (app, _pool, _dir) = test_app().await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(set_cookie.contains("Max-Age=0"));
}
