//! Cache types for catalog responses.

use std::time::Duration;

use moka::future::Cache;

use super::types::Product;

/// Cache key for product listings.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    AllProducts,
    SellerProducts(String),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Vec<Product>),
}

pub fn build() -> Cache<CacheKey, CacheValue> {
    Cache::builder()
        .max_capacity(500)
        .time_to_live(Duration::from_secs(60))
        .build()
}
