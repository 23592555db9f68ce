use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{duplicate, not_found, ProductStore};
use crate::error::AppResult;
use crate::models::{NewProduct, Product, ProductPatch, ProductSummary};

/// In-process product collection keyed by `productId`. Insertion order is
/// creation order; the write lock makes every operation atomic.
#[derive(Debug, Default)]
pub struct MemoryProductStore {
    products: RwLock<IndexMap<String, Product>>,
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn insert(&self, product: NewProduct) -> AppResult<Product> {
        let mut products = self.products.write().await;
        if products.contains_key(&product.product_id) {
            return Err(duplicate(&product.product_id));
        }

        let now = Utc::now();
        let stored = Product {
            id: Uuid::new_v4(),
            product_id: product.product_id,
            name: product.name,
            model: product.model,
            price: product.price,
            stock_in: product.stock_in,
            stock_in_time: product.stock_in_time,
            stock_out: product.stock_out,
            stock_out_time: product.stock_out_time,
            created_at: now,
            updated_at: now,
        };
        products.insert(stored.product_id.clone(), stored.clone());
        Ok(stored)
    }

    async fn update(&self, product_id: &str, patch: ProductPatch) -> AppResult<Product> {
        let mut products = self.products.write().await;
        let index = products
            .get_index_of(product_id)
            .ok_or_else(|| not_found(product_id))?;

        let renamed_to = patch
            .product_id
            .as_deref()
            .filter(|new_id| *new_id != product_id);
        if let Some(new_id) = renamed_to {
            if products.contains_key(new_id) {
                return Err(duplicate(new_id));
            }
        }

        if renamed_to.is_some() {
            // Re-key in place so the record keeps its creation position.
            let (_, mut product) = products
                .shift_remove_index(index)
                .ok_or_else(|| not_found(product_id))?;
            product.apply(&patch, Utc::now());
            products.shift_insert(index, product.product_id.clone(), product.clone());
            return Ok(product);
        }

        let (_, product) = products
            .get_index_mut(index)
            .ok_or_else(|| not_found(product_id))?;
        product.apply(&patch, Utc::now());
        Ok(product.clone())
    }

    async fn delete(&self, product_id: &str) -> AppResult<Product> {
        self.products
            .write()
            .await
            .shift_remove(product_id)
            .ok_or_else(|| not_found(product_id))
    }

    async fn list(&self, offset: u64, limit: u64) -> AppResult<Vec<Product>> {
        let products = self.products.read().await;

        // Later insertion wins ties on stock_in_time.
        let mut ordered: Vec<(usize, &Product)> = products.values().enumerate().collect();
        ordered.sort_by(|(ia, a), (ib, b)| {
            b.stock_in_time
                .cmp(&a.stock_in_time)
                .then_with(|| ib.cmp(ia))
        });

        Ok(ordered
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.products.read().await.len() as u64)
    }

    async fn summary(&self) -> AppResult<Vec<ProductSummary>> {
        Ok(self
            .products
            .read()
            .await
            .values()
            .map(ProductSummary::from)
            .collect())
    }
}
