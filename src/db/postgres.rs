use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::{duplicate, not_found, ProductStore};
use crate::error::{AppError, AppResult};
use crate::models::{NewProduct, Product, ProductPatch, ProductSummary};

#[derive(Debug, Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// A unique violation can only come from `products.product_id`.
fn write_error(err: sqlx::Error, product_id: &str) -> AppError {
    let is_duplicate = err
        .as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation());

    if is_duplicate {
        duplicate(product_id)
    } else {
        AppError::Database(err)
    }
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn insert(&self, product: NewProduct) -> AppResult<Product> {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (id, product_id, name, model, price,
                                  stock_in, stock_in_time, stock_out, stock_out_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, product_id, name, model, price, stock_in, stock_in_time,
                      stock_out, stock_out_time, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&product.product_id)
        .bind(&product.name)
        .bind(&product.model)
        .bind(product.price)
        .bind(product.stock_in)
        .bind(product.stock_in_time)
        .bind(product.stock_out)
        .bind(product.stock_out_time)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, &product.product_id))
    }

    async fn update(&self, product_id: &str, patch: ProductPatch) -> AppResult<Product> {
        let clear_or_set_stock_out_time = patch.stock_out_time.is_some();

        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET product_id     = COALESCE($2, product_id),
                name           = COALESCE($3, name),
                model          = COALESCE($4, model),
                price          = COALESCE($5, price),
                stock_in       = COALESCE($6, stock_in),
                stock_in_time  = COALESCE($7, stock_in_time),
                stock_out      = COALESCE($8, stock_out),
                stock_out_time = CASE WHEN $9::boolean THEN $10::timestamptz
                                      ELSE stock_out_time END,
                updated_at     = $11
            WHERE product_id = $1
            RETURNING id, product_id, name, model, price, stock_in, stock_in_time,
                      stock_out, stock_out_time, created_at, updated_at
            "#,
        )
        .bind(product_id)
        .bind(patch.product_id.as_deref())
        .bind(patch.name.as_deref())
        .bind(patch.model.as_deref())
        .bind(patch.price)
        .bind(patch.stock_in)
        .bind(patch.stock_in_time)
        .bind(patch.stock_out)
        .bind(clear_or_set_stock_out_time)
        .bind(patch.stock_out_time.flatten())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| write_error(e, patch.product_id.as_deref().unwrap_or(product_id)))?
        .ok_or_else(|| not_found(product_id))
    }

    async fn delete(&self, product_id: &str) -> AppResult<Product> {
        sqlx::query_as::<_, Product>(
            r#"
            DELETE FROM products
            WHERE product_id = $1
            RETURNING id, product_id, name, model, price, stock_in, stock_in_time,
                      stock_out, stock_out_time, created_at, updated_at
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found(product_id))
    }

    async fn list(&self, offset: u64, limit: u64) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, product_id, name, model, price, stock_in, stock_in_time,
                   stock_out, stock_out_time, created_at, updated_at
            FROM products
            ORDER BY stock_in_time DESC, created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(to_i64(limit))
        .bind(to_i64(offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    async fn count(&self) -> AppResult<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(row.0).unwrap_or(0))
    }

    async fn summary(&self) -> AppResult<Vec<ProductSummary>> {
        let summary = sqlx::query_as::<_, ProductSummary>(
            r#"
            SELECT id, product_id, name, model, price, stock_in - stock_out AS inventory
            FROM products
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(summary)
    }
}
