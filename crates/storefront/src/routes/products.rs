//! Catalog route handlers.

use agromat_core::ProductId;
use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use tracing::instrument;

use crate::backend::BackendError;
use crate::error::{AppError, Result};
use crate::filters;
use crate::routes::views::{Layout, ProductView};
use crate::services::catalog::{self, CatalogQuery};
use crate::state::AppState;

/// One entry in the category filter.
pub struct CategoryOption {
    pub name: String,
    pub selected: bool,
}

/// Catalog listing template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub layout: Layout,
    pub products: Vec<ProductView>,
    pub categories: Vec<CategoryOption>,
    pub search: String,
    pub max_price: String,
    pub filtered: bool,
    pub catalog_unavailable: bool,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub layout: Layout,
    pub product: ProductView,
    pub seller_name: Option<String>,
    /// Units of this product already in the signed-in user's cart.
    pub in_cart: Option<u32>,
    pub related: Vec<ProductView>,
    pub signed_in: bool,
}

/// Display the catalog, filtered by category, price ceiling, and search text.
#[instrument(skip(state, layout))]
pub async fn index(
    State(state): State<AppState>,
    layout: Layout,
    Query(query): Query<CatalogQuery>,
) -> impl IntoResponse {
    let (products, catalog_unavailable) = match state.backend().products().await {
        Ok(products) => (products, false),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load product catalog");
            (Vec::new(), true)
        }
    };

    let selected = query.category.as_deref().map(str::trim).unwrap_or_default();
    let categories = catalog::categories(&products)
        .into_iter()
        .map(|name| CategoryOption {
            selected: name.eq_ignore_ascii_case(selected),
            name,
        })
        .collect();
    let filtered = query.is_active();
    let products = query
        .apply(products)
        .iter()
        .map(|product| ProductView::new(product, state.pricing()))
        .collect();

    ProductsIndexTemplate {
        layout,
        products,
        categories,
        search: query.q.unwrap_or_default(),
        max_price: query.max_price.unwrap_or_default(),
        filtered,
        catalog_unavailable,
    }
}

/// Display one product.
#[instrument(skip(state, layout))]
pub async fn show(
    State(state): State<AppState>,
    layout: Layout,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = ProductId::new(id);
    let products = state.backend().products().await?;
    let product = products
        .iter()
        .find(|product| product.id == id)
        .ok_or(AppError::Backend(BackendError::NotFound))?;

    let related = products
        .iter()
        .filter(|other| {
            other.id != product.id
                && other.is_available()
                && other.category.eq_ignore_ascii_case(&product.category)
        })
        .take(4)
        .map(|other| ProductView::new(other, state.pricing()))
        .collect();

    let signed_in = layout.user.is_some();
    let in_cart = layout
        .cart
        .items
        .iter()
        .find(|item| item.product_id == id.as_str())
        .map(|item| item.quantity);

    Ok(ProductShowTemplate {
        seller_name: product.seller_name().map(str::to_string),
        product: ProductView::new(product, state.pricing()),
        in_cart,
        related,
        signed_in,
        layout,
    })
}
