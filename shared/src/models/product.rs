//! Product Model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    OnSale,
    OffSale,
}

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub product_name: String,
    pub product_desc: String,
    /// Regular list price
    pub price: Decimal,
    pub stock_count: u32,
    pub status: ProductStatus,
    pub create_time: DateTime<Utc>,
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCreate {
    pub product_name: String,
    #[serde(default)]
    pub product_desc: String,
    pub price: Decimal,
    pub stock_count: u32,
}
