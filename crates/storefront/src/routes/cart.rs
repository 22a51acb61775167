//! Cart route handlers.
//!
//! Every mutation goes to the backend and is followed by a fresh fetch; the
//! page is rendered from that fetch. The last fresh cart is kept in the
//! session so the navigation preview can render without a backend call.

use agromat_core::{ProductId, Quantity};
use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::middleware::{OptionalUser, RequireUser};
use crate::models::{CartSnapshot, Notice, session_keys};
use crate::routes::local_path;
use crate::routes::views::{CartView, Layout};
use crate::services::{CartState, CartSync};
use crate::state::AppState;

// =============================================================================
// Session Helpers
// =============================================================================

/// The last cart fetched for this session.
pub(crate) async fn cart_snapshot(session: &Session) -> CartSnapshot {
    session
        .get::<CartSnapshot>(session_keys::CART_SNAPSHOT)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Remember a freshly fetched cart. Stale states are not written back.
pub(crate) async fn store_cart(session: &Session, cart: &CartState) {
    if !cart.is_fresh() {
        return;
    }
    if let Err(e) = session
        .insert(session_keys::CART_SNAPSHOT, &cart.snapshot)
        .await
    {
        tracing::error!("Failed to save cart snapshot to session: {e}");
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    /// Raw field value; blank means one.
    #[serde(default)]
    pub quantity: Option<String>,
    /// Page to go back to afterwards.
    pub return_to: Option<String>,
}

impl AddToCartForm {
    /// The requested quantity, or a message for the buyer.
    fn quantity(&self) -> Result<Quantity, String> {
        let raw = self.quantity.as_deref().map_or("", str::trim);
        if raw.is_empty() {
            return Ok(Quantity::ONE);
        }
        let n: i64 = raw
            .parse()
            .map_err(|_| "Sorry, quantity must be a whole number.".to_string())?;
        Quantity::from_requested(n).map_err(|e| format!("Sorry, {e}."))
    }
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: String,
    pub quantity: i64,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: Layout,
    pub cart: CartView,
}

/// Navigation cart preview fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_preview.html")]
pub struct CartPreviewTemplate {
    pub preview: CartView,
}

fn render_cart(state: &AppState, mut layout: Layout, cart: CartState) -> CartShowTemplate {
    let view = CartView::from_state(&cart, state.pricing());
    layout.with_cart(view.clone(), cart.notice);
    CartShowTemplate { layout, cart: view }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the cart page with a fresh fetch.
#[instrument(skip(state, session, layout, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    layout: Layout,
) -> impl IntoResponse {
    let previous = cart_snapshot(&session).await;
    let cart = CartSync::new(state.backend(), state.pricing())
        .load(&user.auth, previous)
        .await;
    store_cart(&session, &cart).await;

    render_cart(&state, layout, cart)
}

/// Add a product to the cart, then go back to where the buyer was.
#[instrument(skip(state, session, user))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let back = form
        .return_to
        .as_deref()
        .and_then(local_path)
        .unwrap_or("/cart")
        .to_string();

    let quantity = match form.quantity() {
        Ok(quantity) => quantity,
        Err(message) => {
            Notice::error(message).flash(&session).await;
            return Redirect::to(&back).into_response();
        }
    };

    let previous = cart_snapshot(&session).await;
    let cart = CartSync::new(state.backend(), state.pricing())
        .add(
            &user.auth,
            previous,
            &ProductId::new(form.product_id),
            quantity,
        )
        .await;
    store_cart(&session, &cart).await;

    if let Some(notice) = cart.notice {
        notice.flash(&session).await;
    }
    Redirect::to(&back).into_response()
}

/// Change a line's quantity.
#[instrument(skip(state, session, layout, user))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    layout: Layout,
    Form(form): Form<UpdateCartForm>,
) -> impl IntoResponse {
    let previous = cart_snapshot(&session).await;
    let cart = CartSync::new(state.backend(), state.pricing())
        .set_quantity(
            &user.auth,
            previous,
            &ProductId::new(form.product_id),
            form.quantity,
        )
        .await;
    store_cart(&session, &cart).await;

    render_cart(&state, layout, cart)
}

/// Remove a line.
#[instrument(skip(state, session, layout, user))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    layout: Layout,
    Form(form): Form<RemoveFromCartForm>,
) -> impl IntoResponse {
    let previous = cart_snapshot(&session).await;
    let cart = CartSync::new(state.backend(), state.pricing())
        .remove(&user.auth, previous, &ProductId::new(form.product_id))
        .await;
    store_cart(&session, &cart).await;

    render_cart(&state, layout, cart)
}

/// Empty the cart.
#[instrument(skip(state, session, layout, user))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    layout: Layout,
) -> impl IntoResponse {
    let previous = cart_snapshot(&session).await;
    let cart = CartSync::new(state.backend(), state.pricing())
        .clear(&user.auth, previous)
        .await;
    store_cart(&session, &cart).await;

    render_cart(&state, layout, cart)
}

/// Cart preview fragment, freshly fetched. Guests get an empty preview.
#[instrument(skip(state, session, user))]
pub async fn preview(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
) -> impl IntoResponse {
    let Some(user) = user else {
        return CartPreviewTemplate {
            preview: CartView::new(&CartSnapshot::default(), state.pricing(), false),
        };
    };

    let previous = cart_snapshot(&session).await;
    let cart = CartSync::new(state.backend(), state.pricing())
        .load(&user.auth, previous)
        .await;
    store_cart(&session, &cart).await;

    CartPreviewTemplate {
        preview: CartView::from_state(&cart, state.pricing()),
    }
}
