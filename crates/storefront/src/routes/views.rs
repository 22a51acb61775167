//! View models shared by several templates.
//!
//! Templates only see preformatted strings and flags; prices are formatted
//! here with the shared pricing policy.

use agromat_core::{CartTotals, OrderStatus, PaymentStatus, PricingPolicy, ProductStatus};
use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::backend::{Order, Product};
use crate::models::{CartSnapshot, CurrentUser, Notice, session_keys};
use crate::services::CartState;
use crate::state::AppState;

// =============================================================================
// Layout
// =============================================================================

/// Navigation data for the signed-in user.
#[derive(Clone, Debug)]
pub struct NavUser {
    pub first_name: String,
    pub can_sell: bool,
    pub is_admin: bool,
}

impl From<&CurrentUser> for NavUser {
    fn from(user: &CurrentUser) -> Self {
        Self {
            first_name: user.first_name().to_string(),
            can_sell: user.role.can_sell(),
            is_admin: user.role.is_admin(),
        }
    }
}

/// Data every page's base layout needs: the user, a one-shot notice, and the
/// cart preview built from the session's last known cart.
#[derive(Clone, Debug)]
pub struct Layout {
    pub user: Option<NavUser>,
    pub notice: Option<Notice>,
    pub cart: CartView,
}

impl Layout {
    /// Replace the preview with a freshly synced cart and surface its notice.
    pub fn with_cart(&mut self, cart: CartView, notice: Option<Notice>) {
        self.cart = cart;
        if notice.is_some() {
            self.notice = notice;
        }
    }
}

impl FromRequestParts<AppState> for Layout {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let pricing = state.pricing();
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self {
                user: None,
                notice: None,
                cart: CartView::new(&CartSnapshot::default(), pricing, false),
            });
        };

        let user: Option<CurrentUser> = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten();
        let snapshot: CartSnapshot = if user.is_some() {
            session
                .get(session_keys::CART_SNAPSHOT)
                .await
                .ok()
                .flatten()
                .unwrap_or_default()
        } else {
            CartSnapshot::default()
        };

        Ok(Self {
            user: user.as_ref().map(NavUser::from),
            notice: Notice::take(session).await,
            cart: CartView::new(&snapshot, pricing, false),
        })
    }
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Clone, Debug)]
pub struct CartItemView {
    pub product_id: String,
    pub name: String,
    pub unit: Option<String>,
    pub image: Option<String>,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
    /// Whether the decrement control submits (quantity above 1).
    pub can_decrement: bool,
    pub increment_to: u32,
    pub decrement_to: u32,
}

/// Cart lines and totals, formatted for the cart page, checkout summary,
/// and navigation preview.
#[derive(Clone, Debug)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub item_count: u32,
    pub subtotal: String,
    pub tax: String,
    pub tax_rate: String,
    pub shipping: String,
    pub free_shipping: bool,
    /// How much more to spend for free shipping, when shipping is charged.
    pub free_shipping_gap: Option<String>,
    pub total: String,
    pub stale: bool,
}

impl CartView {
    #[must_use]
    pub fn new(snapshot: &CartSnapshot, pricing: &PricingPolicy, stale: bool) -> Self {
        let totals = pricing.totals(&snapshot.lines);
        Self::with_totals(snapshot, &totals, pricing, stale)
    }

    #[must_use]
    pub fn from_state(state: &CartState, pricing: &PricingPolicy) -> Self {
        Self::with_totals(&state.snapshot, &state.totals, pricing, state.stale)
    }

    fn with_totals(
        snapshot: &CartSnapshot,
        totals: &CartTotals,
        pricing: &PricingPolicy,
        stale: bool,
    ) -> Self {
        let items = snapshot
            .lines
            .iter()
            .map(|line| CartItemView {
                product_id: line.product_id.to_string(),
                name: line.name.clone(),
                unit: line.unit.clone(),
                image: line.image.clone(),
                quantity: line.quantity,
                unit_price: pricing.price(line.unit_price).display(),
                line_total: line.line_total(pricing).display(),
                can_decrement: line.quantity > 1,
                increment_to: line.quantity.saturating_add(1),
                decrement_to: line.quantity.saturating_sub(1),
            })
            .collect();

        let gap = pricing.free_shipping_threshold - totals.subtotal.amount;
        let free_shipping_gap = (!totals.free_shipping() && !snapshot.is_empty())
            .then(|| pricing.price(gap.max(rust_decimal::Decimal::ZERO)).display());

        Self {
            items,
            item_count: totals.item_count,
            subtotal: totals.subtotal.display(),
            tax: totals.tax.display(),
            tax_rate: format!(
                "{}%",
                (pricing.tax_rate * rust_decimal::Decimal::ONE_HUNDRED).normalize()
            ),
            shipping: totals.shipping.display(),
            free_shipping: totals.free_shipping(),
            free_shipping_gap,
            total: totals.total.display(),
            stale,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Products
// =============================================================================

/// Product data for cards and the detail page.
#[derive(Clone, Debug)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub price: String,
    pub unit: Option<String>,
    pub category: String,
    pub description: String,
    pub image: Option<String>,
    pub images: Vec<String>,
    pub location: Option<String>,
    pub stock: u32,
    pub sold: u32,
    pub status_label: &'static str,
    pub available: bool,
    pub harvest_date: Option<String>,
    pub expiry_date: Option<String>,
    pub method: Option<String>,
}

impl ProductView {
    #[must_use]
    pub fn new(product: &Product, pricing: &PricingPolicy) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            price: pricing.price(product.price).display(),
            unit: product.unit.clone(),
            category: product.category.clone(),
            description: product.description.clone(),
            image: product.primary_image().map(str::to_string),
            images: product.image.clone(),
            location: product.location.clone(),
            stock: product.quantity,
            sold: product.sold,
            status_label: status_label(product.status.as_ref()),
            available: product.is_available(),
            harvest_date: product.harvest_date.as_deref().map(date_only),
            expiry_date: product.expiry_date.as_deref().map(date_only),
            method: product.method.clone(),
        }
    }
}

const fn status_label(status: Option<&ProductStatus>) -> &'static str {
    match status {
        Some(ProductStatus::InStock) | None => "In stock",
        Some(ProductStatus::OutOfStock) => "Out of stock",
        Some(ProductStatus::PendingApproval) => "Pending approval",
        Some(ProductStatus::Other(_)) => "Unavailable",
    }
}

/// `2026-10-01T00:00:00.000Z` → `2026-10-01`.
#[must_use]
pub fn date_only(value: &str) -> String {
    value.get(..10).unwrap_or(value).to_string()
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Clone, Debug)]
pub struct OrderLineView {
    pub name: String,
    pub quantity: u32,
    pub price: String,
    pub line_total: String,
}

/// One choice in an order status `<select>`.
#[derive(Clone, Debug)]
pub struct StatusOption {
    pub value: &'static str,
    pub selected: bool,
}

/// An order formatted for history, dashboard, and admin tables.
#[derive(Clone, Debug)]
pub struct OrderView {
    pub id: String,
    pub number: String,
    pub reference: Option<String>,
    pub placed_on: Option<String>,
    pub status: String,
    pub status_class: &'static str,
    pub payment_status: String,
    pub paid: bool,
    pub total: String,
    pub unit_count: u32,
    pub address: Option<String>,
    pub instructions: Option<String>,
    pub buyer: Option<String>,
    pub items: Vec<OrderLineView>,
    pub status_options: Vec<StatusOption>,
}

impl OrderView {
    #[must_use]
    pub fn new(order: &Order, pricing: &PricingPolicy) -> Self {
        Self {
            id: order.id.to_string(),
            number: order.id.display_number(),
            reference: order.payment_reference.clone(),
            placed_on: order
                .created_at
                .map(|at| at.format("%-d %b %Y").to_string()),
            status: order.status.to_string(),
            status_class: status_class(&order.status),
            payment_status: order.payment_status.to_string(),
            paid: order.payment_status == PaymentStatus::Success,
            total: pricing.price(order.total_amount).display(),
            unit_count: order.unit_count(),
            address: order.delivery_address.clone(),
            instructions: order.delivery_instructions.clone(),
            buyer: order.buyer().map(crate::backend::BuyerSummary::display_name),
            items: order
                .items
                .iter()
                .map(|item| OrderLineView {
                    name: item.product_name().to_string(),
                    quantity: item.quantity,
                    price: pricing.price(item.price).display(),
                    line_total: pricing.price(item.line_total()).display(),
                })
                .collect(),
            status_options: OrderStatus::SETTABLE
                .iter()
                .map(|status| StatusOption {
                    value: static_status(status),
                    selected: *status == order.status,
                })
                .collect(),
        }
    }
}

const fn status_class(status: &OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending | OrderStatus::Other(_) => "badge-pending",
        OrderStatus::Processing | OrderStatus::Shipped => "badge-progress",
        OrderStatus::Delivered => "badge-done",
        OrderStatus::Cancelled => "badge-cancelled",
    }
}

const fn static_status(status: &OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending | OrderStatus::Other(_) => "pending",
        OrderStatus::Processing => "processing",
        OrderStatus::Shipped => "shipped",
        OrderStatus::Delivered => "delivered",
        OrderStatus::Cancelled => "cancelled",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use agromat_core::CurrencyCode;
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::CartLine;

    fn usd() -> PricingPolicy {
        PricingPolicy {
            currency: CurrencyCode::USD,
            ..PricingPolicy::default()
        }
    }

    fn line(id: &str, price: i64, quantity: u32) -> CartLine {
        CartLine {
            product_id: id.into(),
            name: id.to_string(),
            unit_price: Decimal::new(price, 2),
            quantity,
            unit: Some("kg".to_string()),
            image: None,
            category: String::new(),
        }
    }

    #[test]
    fn test_cart_view_formats_totals() {
        let snapshot = CartSnapshot {
            lines: vec![line("tomato", 599, 2), line("spinach", 349, 1)],
        };
        let view = CartView::new(&snapshot, &usd(), false);

        assert_eq!(view.subtotal, "$15.47");
        assert_eq!(view.tax, "$1.24");
        assert_eq!(view.shipping, "$5.99");
        assert_eq!(view.total, "$22.70");
        assert_eq!(view.tax_rate, "8%");
        assert_eq!(view.item_count, 3);
        assert_eq!(view.free_shipping_gap.as_deref(), Some("$34.53"));
        assert_eq!(view.items[0].line_total, "$11.98");
        assert!(view.items[0].can_decrement);
        assert!(!view.items[1].can_decrement);
    }

    #[test]
    fn test_empty_cart_view() {
        let view = CartView::new(&CartSnapshot::default(), &usd(), true);
        assert!(view.is_empty());
        assert!(view.stale);
        assert_eq!(view.free_shipping_gap, None);
    }

    #[test]
    fn test_date_only() {
        assert_eq!(date_only("2026-10-01T00:00:00.000Z"), "2026-10-01");
        assert_eq!(date_only("soon"), "soon");
    }

    #[test]
    fn test_order_view() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "_id": "650a1b2c3d4e5f6a7b8c9d0e",
            "userId": { "_id": "u1", "firstName": "Ada", "lastName": "Obi" },
            "items": [
                { "productId": { "_id": "tomato", "name": "Tomatoes", "price": 5.99 }, "quantity": 2, "price": 5.99 },
                { "productId": "gone", "quantity": 1, "price": 3.49 }
            ],
            "totalAmount": 22.70,
            "paymentReference": "ORD-1700000000123",
            "paymentStatus": "success",
            "status": "shipped",
            "createdAt": "2026-10-01T09:30:00Z"
        }))
        .unwrap();

        let view = OrderView::new(&order, &usd());
        assert_eq!(view.number, "ORD-8C9D0E");
        assert_eq!(view.total, "$22.70");
        assert_eq!(view.placed_on.as_deref(), Some("1 Oct 2026"));
        assert_eq!(view.buyer.as_deref(), Some("Ada Obi"));
        assert!(view.paid);
        assert_eq!(view.status_class, "badge-progress");
        assert_eq!(view.items[0].line_total, "$11.98");
        assert_eq!(view.items[1].name, "Removed product");
        assert_eq!(view.unit_count, 3);
        let selected: Vec<_> = view
            .status_options
            .iter()
            .filter(|option| option.selected)
            .map(|option| option.value)
            .collect();
        assert_eq!(selected, ["shipped"]);
    }
}
