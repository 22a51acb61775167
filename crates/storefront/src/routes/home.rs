//! Landing page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::filters;
use crate::routes::views::{Layout, ProductView};
use crate::services::catalog;
use crate::state::AppState;

/// Number of products shown in the featured grid.
const FEATURED_COUNT: usize = 8;

/// Static value propositions shown under the hero.
pub struct Highlight {
    pub title: &'static str,
    pub body: &'static str,
}

const HIGHLIGHTS: [Highlight; 3] = [
    Highlight {
        title: "Straight from the farm",
        body: "Buy produce directly from the farmers who grow it.",
    },
    Highlight {
        title: "Fair prices",
        body: "Sellers set their own prices with no middlemen in between.",
    },
    Highlight {
        title: "Secure payment",
        body: "Pay by card or bank transfer through Paystack.",
    },
];

/// Landing page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub featured: Vec<ProductView>,
    pub categories: Vec<String>,
    pub highlights: &'static [Highlight],
    pub catalog_unavailable: bool,
}

/// Display the landing page.
#[instrument(skip(state, layout))]
pub async fn home(State(state): State<AppState>, layout: Layout) -> impl IntoResponse {
    let (products, catalog_unavailable) = match state.backend().products().await {
        Ok(products) => (products, false),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load products for home page");
            (Vec::new(), true)
        }
    };

    let categories = catalog::categories(&products);
    let featured = catalog::featured(products, FEATURED_COUNT)
        .iter()
        .map(|product| ProductView::new(product, state.pricing()))
        .collect();

    HomeTemplate {
        layout,
        featured,
        categories,
        highlights: &HIGHLIGHTS,
        catalog_unavailable,
    }
}
