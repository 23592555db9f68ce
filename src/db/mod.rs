mod memory;
mod postgres;

pub use memory::MemoryProductStore;
pub use postgres::PgProductStore;

use async_trait::async_trait;

use crate::error::{AppError, AppResult};
use crate::models::{NewProduct, Product, ProductPatch, ProductSummary};

/// Access to the product collection. One call per request operation; each
/// call is atomic per record and nothing more.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Fails with `BadRequest` when `productId` is already taken.
    async fn insert(&self, product: NewProduct) -> AppResult<Product>;

    /// Returns the record as it is after the update.
    async fn update(&self, product_id: &str, patch: ProductPatch) -> AppResult<Product>;

    /// Returns the removed record.
    async fn delete(&self, product_id: &str) -> AppResult<Product>;

    /// Newest `stockInTime` first.
    async fn list(&self, offset: u64, limit: u64) -> AppResult<Vec<Product>>;

    async fn count(&self) -> AppResult<u64>;

    /// Every record in creation order, with its inventory level.
    async fn summary(&self) -> AppResult<Vec<ProductSummary>>;
}

pub(crate) fn not_found(product_id: &str) -> AppError {
    AppError::NotFound(format!("Product {} not found", product_id))
}

pub(crate) fn duplicate(product_id: &str) -> AppError {
    AppError::BadRequest(format!(
        "duplicate key: productId \"{}\" already exists",
        product_id
    ))
}
