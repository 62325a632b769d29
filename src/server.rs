//! HTTP server for the specimen catalog.
//!
//! Serves the browse pages' data as JSON, a read-only `/api` surface for
//! external consumers, and the admin session endpoints.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/api/stats` | Record counts for the landing page |
//! | `GET`  | `/plants` | Paginated plant list with filters |
//! | `GET`  | `/plants/{id}` | Plant detail |
//! | `POST` | `/plants/add` | Create a plant from form data |
//! | `POST` | `/plants/{id}/edit` | Update a plant from form data |
//! | `POST` | `/plants/{id}/delete` | Delete a plant |
//! | `GET`  | `/insects` | Paginated insect list with filters |
//! | `GET`  | `/insects/{id}` | Insect detail |
//! | `POST` | `/insects/add` | Create an insect from form data |
//! | `POST` | `/insects/{id}/edit` | Update an insect from form data |
//! | `POST` | `/insects/{id}/delete` | Delete an insect |
//! | `GET`  | `/api/plants` | All plants, external representation |
//! | `GET`  | `/api/plants/search` | Capped free-text plant search |
//! | `GET`  | `/api/plants/{id}` | One plant, external representation |
//! | `GET`  | `/api/insects` | All insects, external representation |
//! | `GET`  | `/api/insects/search` | Capped free-text insect search |
//! | `GET`  | `/api/insects/{id}` | One insect, external representation |
//! | `POST` | `/admin/login` | Check credentials, set session cookie |
//! | `POST` | `/admin/logout` | Expire the session cookie |
//! | `GET`  | `/admin/session` | Report whether the caller is admin |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "no plant with id 7" } }
//! ```
//!
//! Error codes: `unauthorized` (401), `not_found` (404), `write_error` (500),
//! `internal` (500). A failed create additionally echoes
//! the submitted form under a `submitted` key so a client can restore the
//! form without re-entry.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::auth::{self, ADMIN_COOKIE};
use crate::config::Config;
use crate::insect::InsectRecord;
use crate::normalize::parse_date;
use crate::plant::PlantRecord;
use crate::store::{self, InsectFilter, Page, PlantFilter};

const PLANTS_PER_PAGE: i64 = 50;
const INSECTS_PER_PAGE: i64 = 20;
const SEARCH_LIMIT: i64 = 50;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: SqlitePool,
}

/// Builds the full application router. Exposed so tests can drive handlers
/// without binding a socket.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/stats", get(handle_stats))
        .route("/plants", get(handle_plant_list))
        .route("/plants/add", post(handle_plant_add))
        .route("/plants/{id}", get(handle_plant_detail))
        .route("/plants/{id}/edit", post(handle_plant_edit))
        .route("/plants/{id}/delete", post(handle_plant_delete))
        .route("/insects", get(handle_insect_list))
        .route("/insects/add", post(handle_insect_add))
        .route("/insects/{id}", get(handle_insect_detail))
        .route("/insects/{id}/edit", post(handle_insect_edit))
        .route("/insects/{id}/delete", post(handle_insect_delete))
        .route("/api/plants", get(handle_api_plants))
        .route("/api/plants/search", get(handle_api_plant_search))
        .route("/api/plants/{id}", get(handle_api_plant_get))
        .route("/api/insects", get(handle_api_insects))
        .route("/api/insects/search", get(handle_api_insect_search))
        .route("/api/insects/{id}", get(handle_api_insect_get))
        .route("/admin/login", post(handle_admin_login))
        .route("/admin/logout", post(handle_admin_logout))
        .route("/admin/session", get(handle_admin_session))
        .layer(cors)
        .with_state(state)
}

/// Binds the configured address and serves until the process terminates.
pub async fn run_server(config: &Config, pool: SqlitePool) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState {
        config: Arc::new(config.clone()),
        pool,
    };
    let app = build_router(state);

    println!("Catalog server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"not_found"`, `"unauthorized"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn unauthorized(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::UNAUTHORIZED,
        code: "unauthorized".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: err.to_string(),
    }
}

/// A failed create echoes the submitted form so the client can restore it.
fn write_error(err: anyhow::Error, submitted: &HashMap<String, String>) -> Response {
    let body = serde_json::json!({
        "error": { "code": "write_error", "message": err.to_string() },
        "submitted": submitted,
    });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/stats ============

async fn handle_stats(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let stats = store::catalog_stats(&state.pool).await.map_err(internal)?;
    Ok(Json(serde_json::json!({
        "plant_count": stats.plant_count,
        "insect_count": stats.insect_count,
        "total_count": stats.plant_count + stats.insect_count,
        "family_count": stats.family_count,
        "country_count": stats.country_count,
    })))
}

// ============ Plant browse pages ============

#[derive(Deserialize, Default)]
struct PlantListQuery {
    q: Option<String>,
    family: Option<String>,
    country: Option<String>,
    habitat: Option<String>,
    page: Option<i64>,
}

fn page_json<T, F>(page: Page<T>, to_external: F) -> serde_json::Value
where
    F: Fn(&T) -> serde_json::Value,
{
    serde_json::json!({
        "items": page.items.iter().map(&to_external).collect::<Vec<_>>(),
        "page": page.page,
        "per_page": page.per_page,
        "total": page.total,
        "total_pages": page.total_pages,
    })
}

async fn handle_plant_list(
    State(state): State<AppState>,
    Query(query): Query<PlantListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let filter = PlantFilter {
        q: query.q,
        family: query.family,
        country: query.country,
        habitat: query.habitat,
    };
    let page = store::list_plants(
        &state.pool,
        &filter,
        query.page.unwrap_or(1),
        PLANTS_PER_PAGE,
    )
    .await
    .map_err(internal)?;

    let mut body = page_json(page, PlantRecord::to_external);
    body["filters"] = serde_json::json!({
        "families": store::plant_families(&state.pool).await.map_err(internal)?,
        "countries": store::plant_countries(&state.pool).await.map_err(internal)?,
        "habitats": store::plant_habitats(&state.pool).await.map_err(internal)?,
    });
    Ok(Json(body))
}

async fn handle_plant_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let record = store::get_plant(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("no plant with id {}", id)))?;
    Ok(Json(record.to_external()))
}

async fn handle_plant_add(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let record = PlantRecord::from_external(&form);
    match store::insert_plant(&state.pool, &record).await {
        Ok(id) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "status": "created", "id": id })),
        )
            .into_response(),
        Err(err) => write_error(err, &form),
    }
}

async fn handle_plant_edit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut record = store::get_plant(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("no plant with id {}", id)))?;
    for (key, value) in &form {
        record.apply_external(key, value);
    }
    store::update_plant(&state.pool, &record)
        .await
        .map_err(internal)?;
    Ok(Json(serde_json::json!({ "status": "updated", "id": id })))
}

async fn handle_plant_delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = store::delete_plant(&state.pool, id).await.map_err(internal)?;
    if !deleted {
        return Err(not_found(format!("no plant with id {}", id)));
    }
    Ok(Json(serde_json::json!({ "status": "deleted", "id": id })))
}

// ============ Insect browse pages ============

#[derive(Deserialize, Default)]
struct InsectListQuery {
    q: Option<String>,
    family: Option<String>,
    province: Option<String>,
    collection_date_start: Option<String>,
    collection_date_end: Option<String>,
    page: Option<i64>,
}

impl InsectListQuery {
    /// Date bounds are free text from the query string and go through the
    /// same normalization as feed dates; unparseable bounds are ignored.
    fn filter(self) -> InsectFilter {
        InsectFilter {
            q: self.q,
            family: self.family,
            province: self.province,
            collection_date_start: self.collection_date_start.as_deref().and_then(parse_date),
            collection_date_end: self.collection_date_end.as_deref().and_then(parse_date),
        }
    }
}

async fn handle_insect_list(
    State(state): State<AppState>,
    Query(query): Query<InsectListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let page_number = query.page.unwrap_or(1);
    let filter = query.filter();
    let page = store::list_insects(&state.pool, &filter, page_number, INSECTS_PER_PAGE)
        .await
        .map_err(internal)?;

    let mut body = page_json(page, InsectRecord::to_external);
    body["filters"] = serde_json::json!({
        "families": store::insect_family_names(&state.pool).await.map_err(internal)?,
        "provinces": store::insect_provinces(&state.pool).await.map_err(internal)?,
    });
    Ok(Json(body))
}

async fn handle_insect_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let record = store::get_insect(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("no insect with id {}", id)))?;
    Ok(Json(record.to_external()))
}

async fn handle_insect_add(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let record = InsectRecord::from_external(&form);
    match store::insert_insect(&state.pool, &record).await {
        Ok(id) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "status": "created", "id": id })),
        )
            .into_response(),
        Err(err) => write_error(err, &form),
    }
}

async fn handle_insect_edit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut record = store::get_insect(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("no insect with id {}", id)))?;
    for (key, value) in &form {
        record.apply_external(key, value);
    }
    store::update_insect(&state.pool, &record)
        .await
        .map_err(internal)?;
    Ok(Json(serde_json::json!({ "status": "updated", "id": id })))
}

async fn handle_insect_delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = store::delete_insect(&state.pool, id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(not_found(format!("no insect with id {}", id)));
    }
    Ok(Json(serde_json::json!({ "status": "deleted", "id": id })))
}

// ============ Read-only JSON API ============

/// Search accepts the free-text query and the same filters as the browse
/// page. All of them are optional; an absent or blank `q` just means no
/// free-text predicate.
#[derive(Deserialize, Default)]
struct PlantSearchQuery {
    q: Option<String>,
    family: Option<String>,
    country: Option<String>,
    habitat: Option<String>,
    limit: Option<i64>,
}

#[derive(Deserialize, Default)]
struct InsectSearchQuery {
    q: Option<String>,
    family: Option<String>,
    province: Option<String>,
    collection_date_start: Option<String>,
    collection_date_end: Option<String>,
    limit: Option<i64>,
}

fn nonblank(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

async fn handle_api_plants(
    State(state): State<AppState>,
) -> Result<Json<Vec<serde_json::Value>>, AppError> {
    let records = store::list_all_plants(&state.pool).await.map_err(internal)?;
    Ok(Json(records.iter().map(PlantRecord::to_external).collect()))
}

async fn handle_api_plant_search(
    State(state): State<AppState>,
    Query(query): Query<PlantSearchQuery>,
) -> Result<Json<Vec<serde_json::Value>>, AppError> {
    let filter = PlantFilter {
        q: nonblank(query.q),
        family: nonblank(query.family),
        country: nonblank(query.country),
        habitat: nonblank(query.habitat),
    };
    let limit = query.limit.unwrap_or(SEARCH_LIMIT).clamp(1, SEARCH_LIMIT);
    let records = store::search_plants(&state.pool, &filter, limit)
        .await
        .map_err(internal)?;
    Ok(Json(records.iter().map(PlantRecord::to_external).collect()))
}

async fn handle_api_plant_get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let record = store::get_plant(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("no plant with id {}", id)))?;
    Ok(Json(record.to_external()))
}

async fn handle_api_insects(
    State(state): State<AppState>,
) -> Result<Json<Vec<serde_json::Value>>, AppError> {
    let records = store::list_all_insects(&state.pool).await.map_err(internal)?;
    Ok(Json(records.iter().map(InsectRecord::to_external).collect()))
}

async fn handle_api_insect_search(
    State(state): State<AppState>,
    Query(query): Query<InsectSearchQuery>,
) -> Result<Json<Vec<serde_json::Value>>, AppError> {
    let filter = InsectFilter {
        q: nonblank(query.q),
        family: nonblank(query.family),
        province: nonblank(query.province),
        collection_date_start: query.collection_date_start.as_deref().and_then(parse_date),
        collection_date_end: query.collection_date_end.as_deref().and_then(parse_date),
    };
    let limit = query.limit.unwrap_or(SEARCH_LIMIT).clamp(1, SEARCH_LIMIT);
    let records = store::search_insects(&state.pool, &filter, limit)
        .await
        .map_err(internal)?;
    Ok(Json(records.iter().map(InsectRecord::to_external).collect()))
}

async fn handle_api_insect_get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let record = store::get_insect(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("no insect with id {}", id)))?;
    Ok(Json(record.to_external()))
}

// ============ Admin session ============

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn handle_admin_login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if !auth::verify_credentials(&state.config.admin, &form.username, &form.password) {
        return Err(unauthorized("invalid username or password"));
    }
    let token = auth::sign_session(&state.config.secret_key);
    let cookie = format!("{}={}; Path=/; HttpOnly", ADMIN_COOKIE, token);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({ "status": "ok" })),
    )
        .into_response())
}

async fn handle_admin_logout() -> Response {
    let cookie = format!("{}=; Path=/; HttpOnly; Max-Age=0", ADMIN_COOKIE);
    (
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({ "status": "ok" })),
    )
        .into_response()
}

fn session_token(headers: &HeaderMap) -> Option<&str> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == ADMIN_COOKIE).then_some(value)
    })
}

async fn handle_admin_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    let is_admin = session_token(&headers)
        .map(|token| auth::verify_session(&state.config.secret_key, token))
        .unwrap_or(false);
    Json(serde_json::json!({ "is_admin": is_admin }))
}
