use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::info;

use crate::{
    error::AppResult,
    models::{
        page_offset, total_pages, CreateProduct, PageQuery, Product, ProductSummary,
        UpdateProduct, PAGE_SIZE,
    },
    AppState,
};

// ── Create ────────────────────────────────────────────────────────────────────

pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<CreateProduct>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let Json(payload) = payload?;
    let new_product = payload.validate(Utc::now())?;

    let start = Instant::now();
    let product = state.store.insert(new_product).await?;
    let elapsed = start.elapsed();

    info!(
        product_id = %product.product_id,
        id = %product.id,
        elapsed_ms = elapsed.as_millis(),
        "Created product"
    );

    Ok((StatusCode::CREATED, Json(product)))
}

// ── Delete ────────────────────────────────────────────────────────────────────

/// `productId` that collides with the static summary route.
const SUMMARY_PRODUCT_ID: &str = "summary";

pub async fn delete_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> AppResult<Json<Product>> {
    delete_by_product_id(&state, &product_id).await
}

/// `DELETE /api/products/summary` still targets the product with that id.
pub async fn delete_summary_product(State(state): State<AppState>) -> AppResult<Json<Product>> {
    delete_by_product_id(&state, SUMMARY_PRODUCT_ID).await
}

async fn delete_by_product_id(state: &AppState, product_id: &str) -> AppResult<Json<Product>> {
    let start = Instant::now();
    let product = state.store.delete(product_id).await?;
    let elapsed = start.elapsed();

    info!(product_id = %product_id, elapsed_ms = elapsed.as_millis(), "Deleted product");

    Ok(Json(product))
}

// ── Update ────────────────────────────────────────────────────────────────────

pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    payload: Result<Json<UpdateProduct>, JsonRejection>,
) -> AppResult<Json<Product>> {
    update_by_product_id(&state, &product_id, payload).await
}

/// `PUT /api/products/summary` still targets the product with that id.
pub async fn update_summary_product(
    State(state): State<AppState>,
    payload: Result<Json<UpdateProduct>, JsonRejection>,
) -> AppResult<Json<Product>> {
    update_by_product_id(&state, SUMMARY_PRODUCT_ID, payload).await
}

async fn update_by_product_id(
    state: &AppState,
    product_id: &str,
    payload: Result<Json<UpdateProduct>, JsonRejection>,
) -> AppResult<Json<Product>> {
    let Json(payload) = payload?;
    let patch = payload.validate()?;

    let start = Instant::now();
    let product = state.store.update(product_id, patch).await?;
    let elapsed = start.elapsed();

    info!(
        product_id = %product_id,
        current_product_id = %product.product_id,
        elapsed_ms = elapsed.as_millis(),
        "Updated product"
    );

    Ok(Json(product))
}

// ── List ──────────────────────────────────────────────────────────────────────

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let page = query.page();

    let start = Instant::now();
    let products = state.store.list(page_offset(page), PAGE_SIZE).await?;
    let total = state.store.count().await?;
    let elapsed = start.elapsed();

    info!(
        page,
        count = products.len(),
        total,
        elapsed_ms = elapsed.as_millis(),
        "Listed products"
    );

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "page": page,
            "totalPages": total_pages(total),
            "total": total,
            "products": products,
        })),
    ))
}

// ── Summary ───────────────────────────────────────────────────────────────────

pub async fn product_summary(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ProductSummary>>> {
    let start = Instant::now();
    let summary = state.store.summary().await?;
    let elapsed = start.elapsed();

    info!(
        count = summary.len(),
        elapsed_ms = elapsed.as_millis(),
        "Computed stock summary"
    );

    Ok(Json(summary))
}
