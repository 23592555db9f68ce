use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Records per page on `GET /api/products`.
pub const PAGE_SIZE: u64 = 10;

/// One inventory line item as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub product_id: String,
    pub name: String,
    pub model: String,
    pub price: f64,
    pub stock_in: f64,
    pub stock_in_time: DateTime<Utc>,
    pub stock_out: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_out_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Stock received minus stock dispatched.
    pub fn inventory(&self) -> f64 {
        self.stock_in - self.stock_out
    }

    /// Overwrite every field the patch carries and bump `updated_at`.
    pub fn apply(&mut self, patch: &ProductPatch, now: DateTime<Utc>) {
        if let Some(product_id) = &patch.product_id {
            self.product_id.clone_from(product_id);
        }
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(model) = &patch.model {
            self.model.clone_from(model);
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(stock_in) = patch.stock_in {
            self.stock_in = stock_in;
        }
        if let Some(stock_in_time) = patch.stock_in_time {
            self.stock_in_time = stock_in_time;
        }
        if let Some(stock_out) = patch.stock_out {
            self.stock_out = stock_out;
        }
        if let Some(stock_out_time) = patch.stock_out_time {
            self.stock_out_time = stock_out_time;
        }
        self.updated_at = now;
    }
}

/// Identifying fields plus the derived inventory level.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub product_id: String,
    pub name: String,
    pub model: String,
    pub price: f64,
    pub inventory: f64,
}

impl From<&Product> for ProductSummary {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id,
            product_id: p.product_id.clone(),
            name: p.name.clone(),
            model: p.model.clone(),
            price: p.price,
            inventory: p.inventory(),
        }
    }
}

// ── Request payloads ─────────────────────────────────────────────────────────

/// Body of `POST /api/products`. Every field is optional at the serde level so
/// that missing fields are reported together by [`CreateProduct::validate`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduct {
    pub product_id: Option<String>,
    pub name: Option<String>,
    pub model: Option<String>,
    pub price: Option<f64>,
    pub stock_in: Option<f64>,
    pub stock_in_time: Option<DateTime<Utc>>,
    pub stock_out: Option<f64>,
    pub stock_out_time: Option<DateTime<Utc>>,
}

/// A create request that passed required-field checks, defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub product_id: String,
    pub name: String,
    pub model: String,
    pub price: f64,
    pub stock_in: f64,
    pub stock_in_time: DateTime<Utc>,
    pub stock_out: f64,
    pub stock_out_time: Option<DateTime<Utc>>,
}

impl CreateProduct {
    pub fn validate(self, now: DateTime<Utc>) -> AppResult<NewProduct> {
        let mut missing = Vec::new();
        let product_id = required_text(self.product_id, "productId", &mut missing);
        let name = required_text(self.name, "name", &mut missing);
        let model = required_text(self.model, "model", &mut missing);
        if self.price.is_none() {
            missing.push("price");
        }

        match (product_id, name, model, self.price) {
            (Some(product_id), Some(name), Some(model), Some(price)) => {
                Ok(NewProduct {
                    product_id,
                    name,
                    model,
                    price,
                    stock_in: self.stock_in.unwrap_or(0.0),
                    stock_in_time: self.stock_in_time.unwrap_or(now),
                    stock_out: self.stock_out.unwrap_or(0.0),
                    stock_out_time: self.stock_out_time,
                })
            }
            _ => Err(validation_failed(&missing)),
        }
    }
}

/// Body of `PUT /api/products/:productId`.
///
/// The outer `Option` records whether a field was sent at all; the inner one
/// whether it was sent as `null`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProduct {
    #[serde(default, deserialize_with = "present")]
    pub product_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub model: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub price: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub stock_in: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub stock_in_time: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "present")]
    pub stock_out: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub stock_out_time: Option<Option<DateTime<Utc>>>,
}

/// Validated field replacements. `None` leaves the stored value untouched;
/// `stock_out_time: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub product_id: Option<String>,
    pub name: Option<String>,
    pub model: Option<String>,
    pub price: Option<f64>,
    pub stock_in: Option<f64>,
    pub stock_in_time: Option<DateTime<Utc>>,
    pub stock_out: Option<f64>,
    pub stock_out_time: Option<Option<DateTime<Utc>>>,
}

impl UpdateProduct {
    pub fn validate(self) -> AppResult<ProductPatch> {
        let mut missing = Vec::new();
        let patch = ProductPatch {
            product_id: self
                .product_id
                .and_then(|v| required_text(v, "productId", &mut missing)),
            name: self.name.and_then(|v| required_text(v, "name", &mut missing)),
            model: self.model.and_then(|v| required_text(v, "model", &mut missing)),
            price: self.price.and_then(|v| not_null(v, "price", &mut missing)),
            stock_in: self.stock_in.and_then(|v| not_null(v, "stockIn", &mut missing)),
            stock_in_time: self
                .stock_in_time
                .and_then(|v| not_null(v, "stockInTime", &mut missing)),
            stock_out: self.stock_out.and_then(|v| not_null(v, "stockOut", &mut missing)),
            stock_out_time: self.stock_out_time,
        };

        if missing.is_empty() {
            Ok(patch)
        } else {
            Err(validation_failed(&missing))
        }
    }
}

fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn required_text(
    value: Option<String>,
    field: &'static str,
    missing: &mut Vec<&'static str>,
) -> Option<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Some(v),
        _ => {
            missing.push(field);
            None
        }
    }
}

fn not_null<T>(value: Option<T>, field: &'static str, missing: &mut Vec<&'static str>) -> Option<T> {
    if value.is_none() {
        missing.push(field);
    }
    value
}

fn validation_failed(missing: &[&str]) -> AppError {
    let reasons: Vec<String> = missing.iter().map(|f| format!("{f} is required")).collect();
    AppError::BadRequest(format!("Product validation failed: {}", reasons.join(", ")))
}

// ── Query parameters ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    /// Kept as text so that junk values fall back to page 1 instead of
    /// rejecting the request.
    pub page: Option<String>,
}

impl PageQuery {
    /// 1-indexed page number; anything unparsable or below 1 means page 1.
    pub fn page(&self) -> u64 {
        self.page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|page| *page >= 1)
            .unwrap_or(1)
    }
}

/// Number of records to skip to reach `page`.
pub fn page_offset(page: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(PAGE_SIZE)
}

pub fn total_pages(total: u64) -> u64 {
    total.div_ceil(PAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_create() -> CreateProduct {
        CreateProduct {
            product_id: Some("P-001".to_string()),
            name: Some("Drill".to_string()),
            model: Some("DX-9".to_string()),
            price: Some(49.5),
            ..CreateProduct::default()
        }
    }

    fn stored() -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(),
            product_id: "P-001".to_string(),
            name: "Drill".to_string(),
            model: "DX-9".to_string(),
            price: 49.5,
            stock_in: 10.0,
            stock_in_time: now,
            stock_out: 3.0,
            stock_out_time: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    // ── Create validation ─────────────────────────────────────────────────────

    #[test]
    fn create_applies_defaults() {
        let now = Utc::now();
        let new = full_create().validate(now).unwrap();
        assert_eq!(new.stock_in, 0.0);
        assert_eq!(new.stock_out, 0.0);
        assert_eq!(new.stock_in_time, now);
        assert!(new.stock_out_time.is_none());
    }

    #[test]
    fn create_keeps_supplied_stock_fields() {
        let when = "2024-03-01T08:00:00Z".parse().unwrap();
        let payload = CreateProduct {
            stock_in: Some(12.0),
            stock_in_time: Some(when),
            ..full_create()
        };
        let new = payload.validate(Utc::now()).unwrap();
        assert_eq!(new.stock_in, 12.0);
        assert_eq!(new.stock_in_time, when);
    }

    #[test]
    fn create_reports_every_missing_field() {
        let err = CreateProduct::default().validate(Utc::now()).unwrap_err();
        let msg = err.to_string();
        for field in ["productId", "name", "model", "price"] {
            assert!(msg.contains(&format!("{field} is required")), "missing {field} in {msg}");
        }
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn create_treats_blank_text_as_missing() {
        let payload = CreateProduct {
            name: Some("   ".to_string()),
            ..full_create()
        };
        let msg = payload.validate(Utc::now()).unwrap_err().to_string();
        assert_eq!(msg, "Product validation failed: name is required");
    }

    #[test]
    fn create_ignores_unknown_fields() {
        let payload: CreateProduct = serde_json::from_value(serde_json::json!({
            "productId": "P-9", "name": "Saw", "model": "S1", "price": 3, "colour": "red"
        }))
        .unwrap();
        assert!(payload.validate(Utc::now()).is_ok());
    }

    // ── Update validation ─────────────────────────────────────────────────────

    #[test]
    fn update_distinguishes_absent_from_null() {
        let payload: UpdateProduct =
            serde_json::from_value(serde_json::json!({ "stockOutTime": null })).unwrap();
        assert_eq!(payload.stock_out_time, Some(None));
        assert_eq!(payload.name, None);

        let patch = payload.validate().unwrap();
        assert_eq!(patch.stock_out_time, Some(None));
    }

    #[test]
    fn update_rejects_null_required_fields() {
        let payload: UpdateProduct =
            serde_json::from_value(serde_json::json!({ "name": null, "price": null })).unwrap();
        let msg = payload.validate().unwrap_err().to_string();
        assert_eq!(msg, "Product validation failed: name is required, price is required");
    }

    #[test]
    fn update_rejects_blank_product_id() {
        let payload: UpdateProduct =
            serde_json::from_value(serde_json::json!({ "productId": "" })).unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn empty_update_is_a_no_op_patch() {
        let payload: UpdateProduct = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(payload.validate().unwrap(), ProductPatch::default());
    }

    #[test]
    fn apply_overwrites_only_patched_fields() {
        let mut product = stored();
        let before = product.clone();
        let later = before.updated_at + chrono::Duration::seconds(5);
        let patch = ProductPatch {
            stock_out: Some(4.0),
            stock_out_time: Some(None),
            ..ProductPatch::default()
        };

        product.apply(&patch, later);

        assert_eq!(product.stock_out, 4.0);
        assert!(product.stock_out_time.is_none());
        assert_eq!(product.name, before.name);
        assert_eq!(product.stock_in, before.stock_in);
        assert_eq!(product.updated_at, later);
    }

    // ── Derived values ────────────────────────────────────────────────────────

    #[test]
    fn inventory_is_stock_in_minus_stock_out() {
        let product = stored();
        assert_eq!(product.inventory(), 7.0);
        assert_eq!(ProductSummary::from(&product).inventory, 7.0);
    }

    #[test]
    fn serializes_camel_case_with_document_id() {
        let mut product = stored();
        product.stock_out_time = None;
        let json = serde_json::to_value(&product).unwrap();
        assert!(json.get("_id").is_some());
        assert_eq!(json["productId"], "P-001");
        assert_eq!(json["stockIn"], 10.0);
        assert!(json.get("stockOutTime").is_none());
    }

    // ── Pagination ────────────────────────────────────────────────────────────

    #[test]
    fn page_falls_back_to_first() {
        let page = |raw: Option<&str>| PageQuery { page: raw.map(str::to_string) }.page();
        assert_eq!(page(None), 1);
        assert_eq!(page(Some("abc")), 1);
        assert_eq!(page(Some("0")), 1);
        assert_eq!(page(Some("-3")), 1);
        assert_eq!(page(Some("3")), 3);
    }

    #[test]
    fn page_math() {
        assert_eq!(page_offset(1), 0);
        assert_eq!(page_offset(3), 20);
        assert_eq!(page_offset(u64::MAX), u64::MAX);
        assert_eq!(total_pages(0), 0);
        assert_eq!(total_pages(10), 1);
        assert_eq!(total_pages(25), 3);
    }
}
