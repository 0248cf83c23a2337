use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{info, instrument};

use crate::{
    error::{AppError, AppResult},
    metrics::MetricEntry,
    models::{ProductCategory, ProductPayload, ProductRecord},
    AppState,
};

async fn observe(state: &AppState, operation: &str, start: Instant, item_count: usize, success: bool) {
    state
        .telemetry
        .record(MetricEntry::gateway(operation, start.elapsed(), item_count, success))
        .await;
}

// ── GET /products ─────────────────────────────────────────────────────────────

#[instrument(skip_all)]
pub async fn list_products(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<Vec<ProductRecord>>)> {
    let start = Instant::now();
    let products: Vec<ProductRecord> = state.inventory.list_all().await.into_iter().collect();

    info!(
        count = products.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "Listed all products"
    );
    observe(&state, "get_all_products", start, products.len(), true).await;

    Ok((StatusCode::OK, Json(products)))
}

// ── GET /products/:id ─────────────────────────────────────────────────────────

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<ProductRecord>)> {
    let start = Instant::now();
    let product = state.inventory.get_by_id(&id).await;
    observe(&state, "get_product", start, usize::from(product.is_some()), product.is_some()).await;

    match product {
        Some(product) => Ok((StatusCode::OK, Json(product))),
        None => Err(AppError::NotFound(format!("Product with ID {id} not found"))),
    }
}

// ── GET /categories/:category/products ────────────────────────────────────────

#[instrument(skip(state))]
pub async fn list_category_products(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> AppResult<(StatusCode, Json<Vec<ProductRecord>>)> {
    let start = Instant::now();
    let products = state.inventory.list_by_category(&category).await?;

    info!(%category, count = products.len(), "Listed category products");
    observe(&state, "get_products_by_category", start, products.len(), true).await;

    Ok((StatusCode::OK, Json(products)))
}

// ── POST /categories/:category/products ───────────────────────────────────────

#[instrument(skip(state, payload))]
pub async fn upsert_product(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Json(payload): Json<ProductPayload>,
) -> AppResult<(StatusCode, Json<ProductRecord>)> {
    let category: ProductCategory = category.parse()?;
    let product = ProductRecord::from(payload);
    if product.unit_price < Decimal::ZERO {
        return Err(AppError::BadRequest("unit_price must be >= 0".to_string()));
    }
    product
        .total_price()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let start = Instant::now();
    let stored = state
        .inventory
        .upsert(category.as_str(), product)
        .await?;
    observe(&state, "add_or_update_product", start, 1, stored.is_some()).await;

    match stored {
        Some(product) => Ok((StatusCode::OK, Json(product))),
        None => Err(AppError::Upstream(
            "Failed to add or update product".to_string(),
        )),
    }
}

// ── DELETE /categories/:category/products/:id ─────────────────────────────────

#[instrument(skip(state))]
pub async fn remove_product(
    State(state): State<AppState>,
    Path((category, id)): Path<(String, String)>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let start = Instant::now();
    let removed = state.inventory.remove(&id, &category).await?;
    observe(&state, "remove_product", start, 1, removed).await;

    if !removed {
        return Err(AppError::NotFound(format!(
            "Product {id} not found or could not be removed"
        )));
    }

    Ok((
        StatusCode::OK,
        Json(json!({ "message": format!("Product {id} removed successfully") })),
    ))
}
