use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::store::{ApiScan, NewApiScan, ScanTable, ScanUpdates};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ScanTable>,
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/v1/scans",
            get(list_scans)
                .post(create_scan)
                .put(update_scan)
                .delete(delete_scans),
        )
        .layer(TraceLayer::new_for_http())
        // Permissive CORS; the layer also answers OPTIONS preflight with 200.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

#[derive(Debug, Serialize)]
struct ListResponse {
    scans: Vec<ApiScan>,
}

async fn list_scans(State(state): State<AppState>) -> Result<Json<ListResponse>, AppError> {
    let scans = state.store.list().await?;
    Ok(Json(ListResponse { scans }))
}

#[derive(Debug, Serialize)]
struct ScanResponse {
    success: bool,
    scan: ApiScan,
}

async fn create_scan(
    State(state): State<AppState>,
    Json(body): Json<NewApiScan>,
) -> Result<(StatusCode, Json<ScanResponse>), AppError> {
    if body.tracking.trim().is_empty() {
        return Err(AppError::bad_request("tracking is required"));
    }

    let scan = state.store.create(body).await?;
    tracing::info!(id = %scan.id, "scan created");
    Ok((
        StatusCode::CREATED,
        Json(ScanResponse {
            success: true,
            scan,
        }),
    ))
}

#[derive(Debug, Deserialize)]
struct UpdateRequest {
    id: String,
    updates: ScanUpdates,
}

async fn update_scan(
    State(state): State<AppState>,
    Json(body): Json<UpdateRequest>,
) -> Result<Json<ScanResponse>, AppError> {
    let merged = state
        .store
        .update(&body.id, body.updates)
        .await?
        .ok_or_else(|| AppError::NotFound(body.id.clone()))?;

    Ok(Json(ScanResponse {
        success: true,
        scan: merged,
    }))
}

#[derive(Debug, Deserialize)]
struct DeleteRequest {
    ids: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct DeleteResponse {
    success: bool,
    deleted: usize,
}

async fn delete_scans(
    State(state): State<AppState>,
    Json(body): Json<DeleteRequest>,
) -> Result<Json<DeleteResponse>, AppError> {
    // Ids may arrive as strings or numbers; stringify uniformly.
    let ids: Vec<String> = body
        .ids
        .iter()
        .map(|id| match id {
            serde_json::Value::String(s) => Ok(s.clone()),
            serde_json::Value::Number(n) => Ok(n.to_string()),
            other => Err(AppError::bad_request(format!(
                "unsupported id value: {other}"
            ))),
        })
        .collect::<Result<_, _>>()?;

    let deleted = state.store.delete_many(&ids).await?;
    Ok(Json(DeleteResponse {
        success: true,
        deleted,
    }))
}
