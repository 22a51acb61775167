//! Seller dashboard: listing form validation and sales overview.

use std::collections::{HashMap, HashSet};

use agromat_core::{PaymentStatus, ProductId, ProductStatus, UserId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::{Order, Product, ProductInput, Ref};

/// Date format used by `<input type="date">`.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Validation failures for the listing form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductFormError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("price must be a number greater than zero")]
    InvalidPrice,

    #[error("quantity must be a whole number greater than zero")]
    InvalidQuantity,

    #[error("{0} must be a date (YYYY-MM-DD)")]
    InvalidDate(&'static str),

    #[error("harvest date must be before the best-before date")]
    HarvestNotBeforeExpiry,
}

/// Listing form as posted. Every field arrives as text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub harvest_date: String,
    #[serde(default)]
    pub expiry_date: String,
    /// Image URLs, one per line.
    #[serde(default)]
    pub images: String,
}

impl ProductForm {
    /// Prefill the form from an existing listing.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            category: product.category.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            quantity: product.quantity.to_string(),
            unit: product.unit.clone().unwrap_or_default(),
            location: product.location.clone().unwrap_or_default(),
            method: product.method.clone().unwrap_or_default(),
            harvest_date: date_prefix(product.harvest_date.as_deref()),
            expiry_date: date_prefix(product.expiry_date.as_deref()),
            images: product.image.join("\n"),
        }
    }

    /// Validate into a backend request body.
    ///
    /// # Errors
    ///
    /// Returns the first rule the form breaks.
    pub fn validate(&self, seller: &UserId) -> Result<ProductInput, ProductFormError> {
        let name = required(&self.name, "name")?;
        let category = required(&self.category, "category")?;
        let description = required(&self.description, "description")?;
        let unit = required(&self.unit, "unit")?;
        let location = required(&self.location, "location")?;
        let method = required(&self.method, "farming method")?;

        let price = self
            .price
            .trim()
            .parse::<Decimal>()
            .ok()
            .filter(|p| *p > Decimal::ZERO)
            .ok_or(ProductFormError::InvalidPrice)?;

        let quantity = self
            .quantity
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|q| *q > 0)
            .ok_or(ProductFormError::InvalidQuantity)?;

        let harvest = parse_date(&self.harvest_date, "harvest date")?;
        let expiry = parse_date(&self.expiry_date, "best-before date")?;
        if harvest >= expiry {
            return Err(ProductFormError::HarvestNotBeforeExpiry);
        }

        let image = self
            .images
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        Ok(ProductInput {
            name,
            category,
            description,
            price,
            location,
            quantity,
            unit,
            image,
            harvest_date: harvest.format(DATE_FORMAT).to_string(),
            expiry_date: expiry.format(DATE_FORMAT).to_string(),
            method,
            seller_id: seller.clone(),
        })
    }
}

fn required(value: &str, field: &'static str) -> Result<String, ProductFormError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ProductFormError::MissingField(field));
    }
    Ok(value.to_string())
}

fn parse_date(value: &str, field: &'static str) -> Result<NaiveDate, ProductFormError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ProductFormError::MissingField(field));
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| ProductFormError::InvalidDate(field))
}

/// Backend dates are ISO timestamps; the form wants the date part.
fn date_prefix(value: Option<&str>) -> String {
    value
        .and_then(|v| v.get(..10))
        .unwrap_or_default()
        .to_string()
}

// =============================================================================
// Overview
// =============================================================================

/// Sales of one listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub name: String,
    pub units: u32,
    pub revenue: Decimal,
}

/// Figures shown on the seller dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellerOverview {
    pub product_count: usize,
    /// Listings with status `in-stock`.
    pub active_listings: usize,
    pub order_count: usize,
    /// Orders still pending or processing.
    pub pending_orders: usize,
    /// Seller's share of paid orders, at purchase-time prices.
    pub revenue: Decimal,
    /// Best sellers by revenue, highest first.
    pub top_products: Vec<ProductSales>,
}

impl SellerOverview {
    const TOP_PRODUCTS: usize = 5;

    #[must_use]
    pub fn compute(products: &[Product], orders: &[Order]) -> Self {
        let own: HashSet<&ProductId> = products.iter().map(|p| &p.id).collect();
        let mut sales: HashMap<ProductId, ProductSales> = HashMap::new();
        let mut revenue = Decimal::ZERO;

        for order in orders
            .iter()
            .filter(|o| o.payment_status == PaymentStatus::Success)
        {
            for item in &order.items {
                let Some(Ref::Populated(product)) = &item.product else {
                    continue;
                };
                if !own.contains(&product.id) {
                    continue;
                }
                let line = item.line_total();
                revenue += line;
                let entry = sales
                    .entry(product.id.clone())
                    .or_insert_with(|| ProductSales {
                        product_id: product.id.clone(),
                        name: product.name.clone(),
                        units: 0,
                        revenue: Decimal::ZERO,
                    });
                entry.units += item.quantity;
                entry.revenue += line;
            }
        }

        let mut top_products: Vec<ProductSales> = sales.into_values().collect();
        top_products.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.name.cmp(&b.name)));
        top_products.truncate(Self::TOP_PRODUCTS);

        Self {
            product_count: products.len(),
            active_listings: products
                .iter()
                .filter(|p| p.status == Some(ProductStatus::InStock))
                .count(),
            order_count: orders.len(),
            pending_orders: orders.iter().filter(|o| o.status.is_open()).count(),
            revenue,
            top_products,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;

    fn form() -> ProductForm {
        ProductForm {
            name: " Heirloom Tomatoes ".to_string(),
            category: "vegetables".to_string(),
            description: "Vine ripened".to_string(),
            price: "5.99".to_string(),
            quantity: "40".to_string(),
            unit: "kg".to_string(),
            location: "Ibadan".to_string(),
            method: "organic".to_string(),
            harvest_date: "2026-10-01".to_string(),
            expiry_date: "2026-10-20".to_string(),
            images: "https://img.example/t1.jpg\n\n https://img.example/t2.jpg ".to_string(),
        }
    }

    #[test]
    fn test_valid_form() {
        let input = form().validate(&UserId::new("s1")).unwrap();
        assert_eq!(input.name, "Heirloom Tomatoes");
        assert_eq!(input.price, Decimal::new(599, 2));
        assert_eq!(input.quantity, 40);
        assert_eq!(input.image.len(), 2);
        assert_eq!(input.seller_id.as_str(), "s1");
    }

    #[test]
    fn test_required_fields() {
        let f = ProductForm {
            method: "  ".to_string(),
            ..form()
        };
        assert_eq!(
            f.validate(&UserId::new("s1")),
            Err(ProductFormError::MissingField("farming method"))
        );
    }

    #[test]
    fn test_price_and_quantity_must_be_positive() {
        let seller = UserId::new("s1");
        for price in ["0", "-1", "abc", ""] {
            let f = ProductForm {
                price: price.to_string(),
                ..form()
            };
            assert_eq!(f.validate(&seller), Err(ProductFormError::InvalidPrice), "{price}");
        }
        for quantity in ["0", "-3", "2.5"] {
            let f = ProductForm {
                quantity: quantity.to_string(),
                ..form()
            };
            assert_eq!(
                f.validate(&seller),
                Err(ProductFormError::InvalidQuantity),
                "{quantity}"
            );
        }
    }

    #[test]
    fn test_harvest_must_precede_expiry() {
        let seller = UserId::new("s1");
        let same_day = ProductForm {
            expiry_date: "2026-10-01".to_string(),
            ..form()
        };
        assert_eq!(
            same_day.validate(&seller),
            Err(ProductFormError::HarvestNotBeforeExpiry)
        );

        let missing = ProductForm {
            harvest_date: String::new(),
            ..form()
        };
        assert_eq!(
            missing.validate(&seller),
            Err(ProductFormError::MissingField("harvest date"))
        );

        let garbled = ProductForm {
            expiry_date: "20/10/2026".to_string(),
            ..form()
        };
        assert_eq!(
            garbled.validate(&seller),
            Err(ProductFormError::InvalidDate("best-before date"))
        );
    }

    #[test]
    fn test_prefill_from_product() {
        let product: Product = serde_json::from_value(json!({
            "_id": "p1", "name": "Yam", "price": 1200, "quantity": 8, "unit": "tuber",
            "harvestDate": "2026-09-01T00:00:00.000Z", "image": ["a.jpg", "b.jpg"]
        }))
        .unwrap();
        let f = ProductForm::from_product(&product);
        assert_eq!(f.harvest_date, "2026-09-01");
        assert_eq!(f.expiry_date, "");
        assert_eq!(f.images, "a.jpg\nb.jpg");
        assert_eq!(f.quantity, "8");
    }

    #[test]
    fn test_overview() {
        let products: Vec<Product> = serde_json::from_value(json!([
            {"_id": "p1", "name": "Tomatoes", "price": 5.99, "status": "in-stock"},
            {"_id": "p2", "name": "Spinach", "price": 3.49, "status": "out-of-stock"}
        ]))
        .unwrap();
        let orders: Vec<Order> = serde_json::from_value(json!([
            {
                "_id": "o1", "paymentStatus": "success", "status": "delivered", "totalAmount": 30,
                "items": [
                    {"productId": {"_id": "p1", "name": "Tomatoes", "price": 5.99}, "quantity": 2, "price": 5.99},
                    {"productId": {"_id": "other", "name": "Beef", "price": 20}, "quantity": 1, "price": 20}
                ]
            },
            {
                "_id": "o2", "paymentStatus": "success", "status": "processing", "totalAmount": 3.49,
                "items": [{"productId": {"_id": "p2", "name": "Spinach", "price": 3.49}, "quantity": 1, "price": 3.49}]
            },
            {
                "_id": "o3", "paymentStatus": "failed", "status": "pending", "totalAmount": 60,
                "items": [{"productId": {"_id": "p1", "name": "Tomatoes", "price": 5.99}, "quantity": 10, "price": 5.99}]
            }
        ]))
        .unwrap();

        let overview = SellerOverview::compute(&products, &orders);

        assert_eq!(overview.product_count, 2);
        assert_eq!(overview.active_listings, 1);
        assert_eq!(overview.order_count, 3);
        assert_eq!(overview.pending_orders, 2);
        // 2 × 5.99 + 3.49; the beef belongs to someone else, o3 is unpaid
        assert_eq!(overview.revenue, Decimal::new(1547, 2));
        assert_eq!(overview.top_products[0].name, "Tomatoes");
        assert_eq!(overview.top_products[0].units, 2);
    }
}
