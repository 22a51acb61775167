//! Catalog filtering.
//!
//! The backend returns the whole catalog; category, price ceiling, and text
//! search are applied here.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::backend::Product;

/// Filter query from `GET /products`. Empty form fields count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub max_price: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
}

impl CatalogQuery {
    fn category(&self) -> Option<&str> {
        non_empty(self.category.as_deref())
    }

    fn search(&self) -> Option<String> {
        non_empty(self.q.as_deref()).map(str::to_lowercase)
    }

    /// Price ceiling; an unparseable value is ignored.
    #[must_use]
    pub fn max_price(&self) -> Option<Decimal> {
        non_empty(self.max_price.as_deref()).and_then(|p| p.parse().ok())
    }

    /// Whether any filter is set.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.category().is_some() || self.max_price().is_some() || self.search().is_some()
    }

    /// Keep the products matching every set filter, in catalog order.
    #[must_use]
    pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
        let category = self.category();
        let max_price = self.max_price();
        let search = self.search();

        products
            .into_iter()
            .filter(|p| category.is_none_or(|c| p.category.eq_ignore_ascii_case(c)))
            .filter(|p| max_price.is_none_or(|max| p.price <= max))
            .filter(|p| {
                search.as_deref().is_none_or(|needle| {
                    p.name.to_lowercase().contains(needle)
                        || p.description.to_lowercase().contains(needle)
                })
            })
            .collect()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Distinct non-empty categories, sorted.
#[must_use]
pub fn categories(products: &[Product]) -> Vec<String> {
    products
        .iter()
        .map(|p| p.category.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Up to `count` available products for the landing page.
#[must_use]
pub fn featured(products: Vec<Product>, count: usize) -> Vec<Product> {
    products
        .into_iter()
        .filter(Product::is_available)
        .take(count)
        .collect()
}
