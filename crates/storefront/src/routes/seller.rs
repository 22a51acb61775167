//! Seller dashboard route handlers.
//!
//! ```text
//! GET  /seller                          overview, listings, and orders
//! GET  /seller/products/new             new listing form
//! POST /seller/products                 create a listing
//! GET  /seller/products/{id}/edit       edit form
//! POST /seller/products/{id}            update a listing
//! POST /seller/products/{id}/delete     delete a listing
//! POST /seller/orders/{id}/status       move an order along
//! ```

use agromat_core::{OrderId, ProductId};
use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::{BackendError, Product};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireSeller;
use crate::models::{CurrentUser, Notice};
use crate::routes::orders::StatusForm;
use crate::routes::views::{Layout, OrderView, ProductView};
use crate::services::seller::{ProductForm, SellerOverview};
use crate::state::AppState;

/// Best seller row.
pub struct TopProductView {
    pub name: String,
    pub units: u32,
    pub revenue: String,
}

/// Seller dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "seller/index.html")]
pub struct SellerIndexTemplate {
    pub layout: Layout,
    pub product_count: usize,
    pub active_listings: usize,
    pub order_count: usize,
    pub pending_orders: usize,
    pub revenue: String,
    pub top_products: Vec<TopProductView>,
    pub products: Vec<ProductView>,
    pub orders: Vec<OrderView>,
}

/// Listing create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "seller/product_form.html")]
pub struct ProductFormTemplate {
    pub layout: Layout,
    /// `None` when creating.
    pub product_id: Option<String>,
    pub form: ProductForm,
    pub error: Option<String>,
}

impl ProductFormTemplate {
    fn action(&self) -> String {
        self.product_id.as_ref().map_or_else(
            || "/seller/products".to_string(),
            |id| format!("/seller/products/{}", urlencoding::encode(id)),
        )
    }
}

/// Load a listing the user may edit: their own, or any listing for admins.
async fn owned_product(state: &AppState, user: &CurrentUser, id: &ProductId) -> Result<Product> {
    let product = state.backend().product(id).await?;
    if user.role.is_admin() || product.seller() == Some(user.id().as_str()) {
        Ok(product)
    } else {
        tracing::warn!(product_id = %id, "Seller tried to edit another seller's listing");
        Err(AppError::Backend(BackendError::NotFound))
    }
}

fn invalid_form(
    layout: Layout,
    product_id: Option<String>,
    form: ProductForm,
    error: String,
) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        ProductFormTemplate {
            layout,
            product_id,
            form,
            error: Some(crate::error::capitalize(&error)),
        },
    )
        .into_response()
}

/// Display the seller dashboard.
#[instrument(skip(state, user, layout))]
pub async fn index(
    State(state): State<AppState>,
    RequireSeller(user): RequireSeller,
    layout: Layout,
) -> Result<impl IntoResponse> {
    let backend = state.backend();
    let (products, mut orders) = tokio::try_join!(
        backend.seller_products(user.id()),
        backend.orders_for_seller(&user.auth, user.id()),
    )?;
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let overview = SellerOverview::compute(&products, &orders);
    let pricing = state.pricing();

    Ok(SellerIndexTemplate {
        layout,
        product_count: overview.product_count,
        active_listings: overview.active_listings,
        order_count: overview.order_count,
        pending_orders: overview.pending_orders,
        revenue: pricing.price(overview.revenue).display(),
        top_products: overview
            .top_products
            .iter()
            .map(|sales| TopProductView {
                name: sales.name.clone(),
                units: sales.units,
                revenue: pricing.price(sales.revenue).display(),
            })
            .collect(),
        products: products
            .iter()
            .map(|product| ProductView::new(product, pricing))
            .collect(),
        orders: orders
            .iter()
            .map(|order| OrderView::new(order, pricing))
            .collect(),
    })
}

/// Display the new listing form.
#[instrument(skip_all)]
pub async fn new_product(_seller: RequireSeller, layout: Layout) -> impl IntoResponse {
    ProductFormTemplate {
        layout,
        product_id: None,
        form: ProductForm::default(),
        error: None,
    }
}

/// Create a listing.
#[instrument(skip(state, session, user, layout))]
pub async fn create_product(
    State(state): State<AppState>,
    session: Session,
    RequireSeller(user): RequireSeller,
    layout: Layout,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let input = match form.validate(user.id()) {
        Ok(input) => input,
        Err(e) => return Ok(invalid_form(layout, None, form, e.to_string())),
    };

    if let Err(e) = state.backend().create_product(&user.auth, &input).await {
        tracing::warn!(error = %e, "Failed to create listing");
        let message = e
            .user_message()
            .map_or_else(|| "we couldn't save your listing".to_string(), str::to_string);
        return Ok(invalid_form(layout, None, form, message));
    }

    tracing::info!(name = %input.name, "Listing created");
    Notice::success(format!("{} is now listed.", input.name))
        .flash(&session)
        .await;
    Ok(Redirect::to("/seller").into_response())
}

/// Display the edit form for a listing.
#[instrument(skip(state, user, layout))]
pub async fn edit_product(
    State(state): State<AppState>,
    RequireSeller(user): RequireSeller,
    layout: Layout,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let product = owned_product(&state, &user, &ProductId::new(id)).await?;

    Ok(ProductFormTemplate {
        layout,
        product_id: Some(product.id.to_string()),
        form: ProductForm::from_product(&product),
        error: None,
    })
}

/// Update a listing.
#[instrument(skip(state, session, user, layout))]
pub async fn update_product(
    State(state): State<AppState>,
    session: Session,
    RequireSeller(user): RequireSeller,
    layout: Layout,
    Path(id): Path<String>,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let product = owned_product(&state, &user, &ProductId::new(id)).await?;
    let product_id = Some(product.id.to_string());

    // Admins editing someone else's listing keep the original seller.
    let seller = product
        .seller()
        .map_or_else(|| user.id().clone(), agromat_core::UserId::new);
    let input = match form.validate(&seller) {
        Ok(input) => input,
        Err(e) => return Ok(invalid_form(layout, product_id, form, e.to_string())),
    };

    if let Err(e) = state
        .backend()
        .update_product(&user.auth, &product.id, &input)
        .await
    {
        tracing::warn!(error = %e, "Failed to update listing");
        let message = e
            .user_message()
            .map_or_else(|| "we couldn't save your changes".to_string(), str::to_string);
        return Ok(invalid_form(layout, product_id, form, message));
    }

    Notice::success(format!("{} was updated.", input.name))
        .flash(&session)
        .await;
    Ok(Redirect::to("/seller").into_response())
}

/// Delete a listing.
#[instrument(skip(state, session, user))]
pub async fn delete_product(
    State(state): State<AppState>,
    session: Session,
    RequireSeller(user): RequireSeller,
    Path(id): Path<String>,
) -> Result<Response> {
    let product = owned_product(&state, &user, &ProductId::new(id)).await?;

    let notice = match state.backend().delete_product(&user.auth, &product.id).await {
        Ok(()) => {
            tracing::info!(product_id = %product.id, "Listing deleted");
            Notice::success(format!("{} was removed.", product.name))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to delete listing");
            Notice::error(format!("We couldn't remove {}.", product.name))
        }
    };
    notice.flash(&session).await;
    Ok(Redirect::to("/seller").into_response())
}

/// Move an order to a new status.
#[instrument(skip(state, session, user))]
pub async fn update_order_status(
    State(state): State<AppState>,
    session: Session,
    RequireSeller(user): RequireSeller,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Response {
    let notice = set_order_status(&state, &user, &OrderId::new(id), &form).await;
    notice.flash(&session).await;
    Redirect::to("/seller").into_response()
}

/// Apply a status change and describe the result.
pub(crate) async fn set_order_status(
    state: &AppState,
    user: &CurrentUser,
    id: &OrderId,
    form: &StatusForm,
) -> Notice {
    let Some(status) = form.settable() else {
        return Notice::error(format!("\"{}\" is not an order status.", form.status.trim()));
    };

    match state
        .backend()
        .update_order_status(&user.auth, id, &status)
        .await
    {
        Ok(()) => {
            tracing::info!(order_id = %id, status = %status, "Order status changed");
            Notice::success(format!(
                "Order {} marked {}.",
                id.display_number(),
                status
            ))
        }
        Err(e) => {
            tracing::warn!(error = %e, order_id = %id, "Failed to change order status");
            Notice::error(format!(
                "We couldn't update order {}.",
                id.display_number()
            ))
        }
    }
}
