use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Value, json};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;

use padron_core::accounting;
use padron_core::catalog::PlanCatalog;
use padron_core::service::{self, ServiceError};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Request-handler state: the pool plus the immutable plan catalog.
///
/// The catalog is read-only after startup, so sharing it through an `Arc`
/// needs no further synchronization.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub catalog: Arc<PlanCatalog>,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            ServiceError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Store(cause) => {
                tracing::error!(error = %format!("{cause:#}"), "store failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = json!({ "ok": false, "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

fn ok_body(data: impl Serialize) -> Value {
    json!({ "ok": true, "data": data })
}

/// Parse a request body, rejecting anything that is not a JSON document.
fn required_json(bytes: &Bytes) -> Result<Value, AppError> {
    serde_json::from_slice::<Value>(bytes)
        .ok()
        .filter(|v| !v.is_null())
        .ok_or_else(|| AppError::bad_request("invalid JSON body"))
}

/// Parse a request body leniently: an unreadable or empty body becomes an
/// empty object, so the register-hours endpoint can apply its default delta.
fn lenient_json(bytes: &Bytes) -> Value {
    serde_json::from_slice::<Value>(bytes).unwrap_or_else(|_| json!({}))
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/clients", get(list_clients).post(create_client))
        .route(
            "/clients/{id}",
            get(get_client).put(update_client).delete(delete_client),
        )
        .route("/clients/{id}/hours", post(register_hours))
        .route("/plans", get(list_plans))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(pool: PgPool, catalog: PlanCatalog, bind: &str, port: u16) -> Result<()> {
    let state = AppState {
        pool,
        catalog: Arc::new(catalog),
    };
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("padron serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("padron serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index(State(state): State<AppState>) -> Result<axum::response::Response, AppError> {
    let clients = service::list_clients(&state.pool, &state.catalog).await?;

    let rows = if clients.is_empty() {
        "<tr><td colspan=\"6\">No clients registered.</td></tr>".to_string()
    } else {
        clients
            .iter()
            .map(|c| {
                let left = accounting::remaining_hours(c);
                let balance = accounting::remaining_balance(c);
                let balance_cell = if balance >= 0.0 {
                    format!("{balance:.2}")
                } else {
                    format!("credit {:.2}", -balance)
                };
                let status = if accounting::is_plan_finished(c) {
                    "finished"
                } else {
                    "active"
                };
                format!(
                    "<tr><td>{id}</td><td>{name}</td><td>{plan}</td><td>{left}</td><td>{balance_cell}</td><td>{status}</td></tr>",
                    id = c.client.id,
                    name = c.client.name,
                    plan = c.client.plan,
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let html = format!(
        "<!DOCTYPE html>\
<html><head><title>padron</title></head><body>\
<h1>padron</h1>\
<p><a href=\"/clients\">/clients</a> | <a href=\"/plans\">/plans</a></p>\
<table><tr><th>ID</th><th>Name</th><th>Plan</th><th>Hours left</th><th>Balance</th><th>Status</th></tr>{rows}</table>\
</body></html>"
    );

    Ok(Html(html).into_response())
}

async fn list_clients(
    State(state): State<AppState>,
) -> Result<axum::response::Response, AppError> {
    let clients = service::list_clients(&state.pool, &state.catalog).await?;
    Ok(Json(ok_body(clients)).into_response())
}

async fn create_client(
    State(state): State<AppState>,
    bytes: Bytes,
) -> Result<axum::response::Response, AppError> {
    let body = required_json(&bytes)?;
    let created = service::create_client(&state.pool, &state.catalog, &body).await?;
    Ok((StatusCode::CREATED, Json(ok_body(created))).into_response())
}

async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<axum::response::Response, AppError> {
    let client = service::get_client(&state.pool, &state.catalog, &id).await?;
    Ok(Json(ok_body(client)).into_response())
}

async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
    bytes: Bytes,
) -> Result<axum::response::Response, AppError> {
    let body = required_json(&bytes)?;
    let updated = service::update_client(&state.pool, &state.catalog, &id, &body).await?;
    Ok(Json(ok_body(updated)).into_response())
}

async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<axum::response::Response, AppError> {
    let deleted = service::delete_client(&state.pool, &state.catalog, &id).await?;
    Ok(Json(ok_body(deleted)).into_response())
}

async fn register_hours(
    State(state): State<AppState>,
    Path(id): Path<String>,
    bytes: Bytes,
) -> Result<axum::response::Response, AppError> {
    // The register button may post an empty body; treat it as defaults.
    let body = lenient_json(&bytes);
    let updated = service::register_hours(&state.pool, &state.catalog, &id, &body).await?;
    Ok(Json(ok_body(updated)).into_response())
}

async fn list_plans(State(state): State<AppState>) -> Result<axum::response::Response, AppError> {
    Ok(Json(ok_body(state.catalog.as_ref())).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use sqlx::PgPool;
    use tower::ServiceExt;

    use padron_core::catalog::PlanCatalog;
    use padron_test_utils::{create_test_db, drop_test_db};

    use super::AppState;

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    fn test_state(pool: PgPool) -> AppState {
        AppState {
            pool,
            catalog: Arc::new(PlanCatalog::builtin().expect("builtin catalog should load")),
        }
    }

    async fn send(
        state: AppState,
        method: &str,
        uri: &str,
        body: Option<&Value>,
    ) -> axum::response::Response {
        let app = super::build_router(state);
        let request = match body {
            Some(value) => Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(value).unwrap()))
                .unwrap(),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        };
        app.oneshot(request).await.unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_sample(state: AppState, name: &str) -> i64 {
        let resp = send(
            state,
            "POST",
            "/clients",
            Some(&json!({ "name": name, "plan": "12h-u" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let json = body_json(resp).await;
        json["data"]["id"].as_i64().expect("created id")
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_index_returns_html() {
        let (pool, db_name) = create_test_db().await;

        let resp = send(test_state(pool.clone()), "GET", "/", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp
            .headers()
            .get("content-type")
            .expect("should have content-type header")
            .to_str()
            .unwrap();
        assert!(
            content_type.contains("text/html"),
            "content-type should contain text/html, got: {content_type}"
        );

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_list_clients_empty() {
        let (pool, db_name) = create_test_db().await;

        let resp = send(test_state(pool.clone()), "GET", "/clients", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json, json!({ "ok": true, "data": [] }));

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_create_returns_enriched_record() {
        let (pool, db_name) = create_test_db().await;
        let state = test_state(pool.clone());

        let resp = send(
            state.clone(),
            "POST",
            "/clients",
            Some(&json!({ "name": "Ana", "plan": "12h-u", "abono": 60 })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let json = body_json(resp).await;
        assert_eq!(json["ok"], true);
        assert_eq!(json["data"]["name"], "Ana");
        assert_eq!(json["data"]["abono"], 60.0);
        assert_eq!(json["data"]["planInfo"]["hours"], 12);

        // The record is visible in the list.
        let resp = send(state, "GET", "/clients", None).await;
        let json = body_json(resp).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 1);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_create_validation_failures() {
        let (pool, db_name) = create_test_db().await;
        let state = test_state(pool.clone());

        let resp = send(
            state.clone(),
            "POST",
            "/clients",
            Some(&json!({ "plan": "12h-u" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["ok"], false);
        assert!(json["error"].as_str().unwrap().contains("name"));

        let resp = send(
            state,
            "POST",
            "/clients",
            Some(&json!({ "name": "Ana", "plan": "no-such-plan" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_create_rejects_malformed_json() {
        let (pool, db_name) = create_test_db().await;

        let app = super::build_router(test_state(pool.clone()));
        let request = Request::builder()
            .method("POST")
            .uri("/clients")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = app.oneshot(request).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["ok"], false);
        assert!(json["error"].as_str().unwrap().contains("JSON"));

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_get_invalid_and_missing_ids() {
        let (pool, db_name) = create_test_db().await;
        let state = test_state(pool.clone());

        let resp = send(state.clone(), "GET", "/clients/abc", None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send(state.clone(), "GET", "/clients/0", None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send(state, "GET", "/clients/9999", None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp).await;
        assert_eq!(json["ok"], false);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_update_partial_and_no_fields() {
        let (pool, db_name) = create_test_db().await;
        let state = test_state(pool.clone());

        let id = create_sample(state.clone(), "Ana").await;

        let resp = send(
            state.clone(),
            "PUT",
            &format!("/clients/{id}"),
            Some(&json!({ "name": "Ana Maria" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["data"]["name"], "Ana Maria");

        let resp = send(
            state,
            "PUT",
            &format!("/clients/{id}"),
            Some(&json!({})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert!(json["error"].as_str().unwrap().contains("no fields"));

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_delete_then_get() {
        let (pool, db_name) = create_test_db().await;
        let state = test_state(pool.clone());

        let id = create_sample(state.clone(), "Gone").await;

        let resp = send(state.clone(), "DELETE", &format!("/clients/{id}"), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["data"]["name"], "Gone");

        let resp = send(state, "GET", &format!("/clients/{id}"), None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_register_hours_defaults_and_bounds() {
        let (pool, db_name) = create_test_db().await;
        let state = test_state(pool.clone());

        let id = create_sample(state.clone(), "Busy").await;

        // Empty body -> delta defaults to 1.
        let resp = send(
            state.clone(),
            "POST",
            &format!("/clients/{id}/hours"),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["data"]["hours"], 1);

        let resp = send(
            state.clone(),
            "POST",
            &format!("/clients/{id}/hours"),
            Some(&json!({ "delta": 24 })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["data"]["hours"], 25);

        let resp = send(
            state,
            "POST",
            &format!("/clients/{id}/hours"),
            Some(&json!({ "delta": 25 })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert!(json["error"].as_str().unwrap().contains("1 and 24"));

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_plans_endpoint() {
        let (pool, db_name) = create_test_db().await;

        let resp = send(test_state(pool.clone()), "GET", "/plans", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["ok"], true);
        let plan = &json["data"]["12h-u"];
        assert_eq!(plan["hours"], 12);
        assert!(plan["price"].as_f64().unwrap() > 0.0);
        assert!(plan["label"].is_string());

        pool.close().await;
        drop_test_db(&db_name).await;
    }
}
