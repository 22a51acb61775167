//! Admin console route handlers.

use agromat_core::OrderId;
use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::Notice;
use crate::routes::orders::StatusForm;
use crate::routes::seller::set_order_status;
use crate::routes::views::{Layout, OrderView};
use crate::services::analytics::OrderAnalytics;
use crate::state::AppState;

/// Payment verification form data.
#[derive(Debug, Deserialize)]
pub struct VerifyForm {
    #[serde(default)]
    pub reference: String,
}

/// Status count row.
pub struct StatusCountView {
    pub status: String,
    pub count: usize,
}

/// Admin console template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/index.html")]
pub struct AdminIndexTemplate {
    pub layout: Layout,
    pub order_count: usize,
    pub revenue: String,
    pub paid_orders: usize,
    pub unpaid_orders: usize,
    pub by_status: Vec<StatusCountView>,
    pub orders: Vec<OrderView>,
}

/// Display every order with marketplace totals.
#[instrument(skip(state, user, layout))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(user): RequireAdmin,
    layout: Layout,
) -> Result<impl IntoResponse> {
    let mut orders = state.backend().all_orders(&user.auth).await?;
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let analytics = OrderAnalytics::compute(&orders);
    let pricing = state.pricing();

    Ok(AdminIndexTemplate {
        layout,
        order_count: analytics.order_count,
        revenue: pricing.price(analytics.revenue).display(),
        paid_orders: analytics.paid_orders,
        unpaid_orders: analytics.unpaid_orders,
        by_status: analytics
            .by_status
            .iter()
            .map(|entry| StatusCountView {
                status: entry.status.to_string(),
                count: entry.count,
            })
            .collect(),
        orders: orders
            .iter()
            .map(|order| OrderView::new(order, pricing))
            .collect(),
    })
}

/// Move any order to a new status.
#[instrument(skip(state, session, user))]
pub async fn update_order_status(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Response {
    let notice = set_order_status(&state, &user, &OrderId::new(id), &form).await;
    notice.flash(&session).await;
    Redirect::to("/admin").into_response()
}

/// Ask the backend to verify an order's payment with the gateway.
#[instrument(skip(state, session, user))]
pub async fn verify_payment(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(user): RequireAdmin,
    Path(id): Path<String>,
    Form(form): Form<VerifyForm>,
) -> Response {
    let id = OrderId::new(id);
    let reference = form.reference.trim();

    let notice = if reference.is_empty() {
        Notice::error(format!(
            "Order {} has no payment reference to verify.",
            id.display_number()
        ))
    } else {
        match state
            .backend()
            .verify_order_payment(&user.auth, &id, reference)
            .await
        {
            Ok(()) => {
                tracing::info!(order_id = %id, reference, "Payment verified");
                Notice::success(format!("Payment for order {} verified.", id.display_number()))
            }
            Err(e) => {
                tracing::warn!(error = %e, order_id = %id, "Payment verification failed");
                let reason = e.user_message().unwrap_or("the gateway did not confirm it");
                Notice::error(format!(
                    "Couldn't verify order {}: {reason}.",
                    id.display_number()
                ))
            }
        }
    };

    notice.flash(&session).await;
    Redirect::to("/admin").into_response()
}
