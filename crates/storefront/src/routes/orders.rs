//! Order history route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::instrument;

use crate::backend::BackendError;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireUser;
use crate::routes::views::{Layout, OrderView};
use crate::state::AppState;

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub layout: Layout,
    pub orders: Vec<OrderView>,
}

/// Order detail and confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub layout: Layout,
    pub order: OrderView,
}

/// Display the signed-in buyer's orders, newest first.
#[instrument(skip(state, user, layout))]
pub async fn index(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    layout: Layout,
) -> Result<impl IntoResponse> {
    let mut orders = state.backend().orders_for_user(&user.auth).await?;
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(OrdersIndexTemplate {
        layout,
        orders: orders
            .iter()
            .map(|order| OrderView::new(order, state.pricing()))
            .collect(),
    })
}

/// Display one order, looked up by id or payment reference.
#[instrument(skip(state, user, layout))]
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    layout: Layout,
    Path(key): Path<String>,
) -> Result<impl IntoResponse> {
    let orders = state.backend().orders_for_user(&user.auth).await?;
    let order = orders
        .iter()
        .find(|order| order.matches_key(&key))
        .ok_or(AppError::Backend(BackendError::NotFound))?;

    Ok(OrderShowTemplate {
        layout,
        order: OrderView::new(order, state.pricing()),
    })
}

/// Order status change form, shared by the seller and admin consoles.
#[derive(Debug, serde::Deserialize)]
pub struct StatusForm {
    #[serde(default)]
    pub status: String,
}

impl StatusForm {
    /// The requested status, if it is one an order may be moved to.
    #[must_use]
    pub fn settable(&self) -> Option<agromat_core::OrderStatus> {
        let status = agromat_core::OrderStatus::from(self.status.trim());
        agromat_core::OrderStatus::SETTABLE
            .contains(&status)
            .then_some(status)
    }
}
