pub mod metrics;
pub mod products;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;

use crate::{models::ProductCategory, AppState};

// ── GET / ─────────────────────────────────────────────────────────────────────

pub async fn root(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "service": state.service.name,
            "version": state.service.version,
            "status": "running",
            "endpoints": [
                "/products",
                "/products/{product_id}",
                "/categories",
                "/categories/{category}/products",
                "/health",
                "/health/upstream",
                "/metrics",
            ],
        })),
    )
}

// ── GET /health ───────────────────────────────────────────────────────────────

pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

// ── GET /health/upstream ──────────────────────────────────────────────────────

/// Counts every product through the backend. Failed categories count as empty,
/// so this always answers 200.
pub async fn upstream_health(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let product_count = state.inventory.count().await;
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "product_count": product_count,
            "upstream_url": state.service.upstream_url,
        })),
    )
}

// ── GET /categories ───────────────────────────────────────────────────────────

pub async fn list_categories() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({ "categories": ProductCategory::names() })),
    )
}
