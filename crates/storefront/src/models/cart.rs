//! Cart snapshot kept in the session.
//!
//! This is the last cart the backend returned, flattened for rendering. It is
//! what the page shows when a later fetch fails.

use agromat_core::{Price, PricedLine, PricingPolicy, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::backend::Cart;

/// One rendered cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub unit: Option<String>,
    pub image: Option<String>,
    pub category: String,
}

impl CartLine {
    /// Unit price × quantity, in the policy's currency.
    #[must_use]
    pub fn line_total(&self, policy: &PricingPolicy) -> Price {
        policy.price(self.unit_price * Decimal::from(self.quantity))
    }
}

impl PricedLine for CartLine {
    fn unit_price(&self) -> Option<Decimal> {
        Some(self.unit_price)
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// The cart as last fetched from the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub lines: Vec<CartLine>,
}

impl CartSnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Quantity of one product, if it is in the cart.
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> Option<u32> {
        self.lines
            .iter()
            .find(|line| &line.product_id == product_id)
            .map(|line| line.quantity)
    }
}

impl From<Cart> for CartSnapshot {
    /// Lines whose product was deleted are dropped here.
    fn from(cart: Cart) -> Self {
        let lines = cart
            .items
            .into_iter()
            .filter_map(|item| {
                let quantity = item.quantity;
                let product = item.live_product()?.clone();
                Some(CartLine {
                    unit: product.unit.clone(),
                    image: product.primary_image().map(str::to_string),
                    product_id: product.id,
                    name: product.name,
                    unit_price: product.price,
                    quantity,
                    category: product.category,
                })
            })
            .collect();
        Self { lines }
    }
}
