//! Checkout route handlers.
//!
//! ```text
//! GET  /checkout          address form with the cart summary
//! POST /checkout          price the cart, open a pending checkout, show the pay page
//! POST /checkout/complete widget success callback: record the order, clear the cart
//! POST /checkout/cancel   widget closed: nothing is recorded, back to the form
//! ```

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{CspNonce, RequireUser};
use crate::models::{CartSnapshot, CurrentUser, Notice, session_keys};
use crate::routes::cart::{cart_snapshot, store_cart};
use crate::routes::views::{CartView, Layout};
use crate::services::checkout::{AddressForm, ShippingAddress};
use crate::services::paystack::{INLINE_SCRIPT_URL, WidgetParams};
use crate::services::{
    CartSync, CheckoutError, CheckoutFlow, CheckoutResult, PaymentOutcome, PendingCheckout,
};
use crate::state::AppState;

/// Checkout form data: contact email plus the delivery address.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub email: String,
    #[serde(flatten)]
    pub address: AddressForm,
}

/// Payment widget callback data.
#[derive(Debug, Deserialize)]
pub struct CompleteForm {
    #[serde(default)]
    pub reference: String,
}

/// Address form template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutShowTemplate {
    pub layout: Layout,
    pub cart: CartView,
    pub email: String,
    pub form: AddressForm,
    pub error: Option<String>,
}

/// Payment page template. Loads the widget and opens it.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/pay.html")]
pub struct CheckoutPayTemplate {
    pub layout: Layout,
    pub cart: CartView,
    pub total: String,
    pub reference: String,
    pub email: String,
    pub widget_json: String,
    pub widget_script: &'static str,
    pub nonce: String,
}

/// Shown when payment went through but the order was not recorded.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/failed.html")]
pub struct CheckoutFailedTemplate {
    pub layout: Layout,
    pub reference: String,
}

fn prefilled_form(user: &CurrentUser) -> AddressForm {
    let mut names = user.name.split_whitespace();
    AddressForm {
        first_name: names.next().unwrap_or_default().to_string(),
        last_name: names.collect::<Vec<_>>().join(" "),
        ..AddressForm::default()
    }
}

/// Display the address form.
#[instrument(skip(state, session, layout, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    mut layout: Layout,
) -> Response {
    let previous = cart_snapshot(&session).await;
    let cart = CartSync::new(state.backend(), state.pricing())
        .load(&user.auth, previous)
        .await;
    store_cart(&session, &cart).await;

    if cart.snapshot.is_empty() {
        Notice::info("Your cart is empty. Add some produce before checking out.")
            .flash(&session)
            .await;
        return Redirect::to("/cart").into_response();
    }

    let view = CartView::from_state(&cart, state.pricing());
    layout.with_cart(view.clone(), cart.notice);

    CheckoutShowTemplate {
        layout,
        cart: view,
        email: user.email.clone(),
        form: prefilled_form(&user),
        error: None,
    }
    .into_response()
}

/// Validate the address, price the cart, and hand over to the payment widget.
#[instrument(skip(state, session, layout, user, nonce, form))]
pub async fn begin(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    mut layout: Layout,
    CspNonce(nonce): CspNonce,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let invalid = |layout: Layout, error: &CheckoutError, form: CheckoutForm| {
        let cart = layout.cart.clone();
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            CheckoutShowTemplate {
                layout,
                cart,
                email: form.email,
                form: form.address,
                error: Some(crate::error::capitalize(&error.to_string())),
            },
        )
            .into_response()
    };

    let address = match ShippingAddress::try_from(form.address.clone()) {
        Ok(address) => address,
        Err(e) => return Ok(invalid(layout, &e, form)),
    };

    let flow = CheckoutFlow::new(state.backend(), state.pricing());
    let pending = match flow.begin(&user.auth, &form.email, address).await {
        Ok(pending) => pending,
        Err(CheckoutError::EmptyCart) => {
            Notice::info("Your cart is empty. Add some produce before checking out.")
                .flash(&session)
                .await;
            return Ok(Redirect::to("/cart").into_response());
        }
        Err(e) if e.is_validation() => return Ok(invalid(layout, &e, form)),
        Err(e) => return Err(AppError::Checkout(e)),
    };

    session
        .insert(session_keys::PENDING_CHECKOUT, &pending)
        .await?;
    crate::error::add_breadcrumb(
        "checkout",
        "Checkout started",
        Some(&[("reference", pending.reference.as_str())]),
    );

    let params = WidgetParams::new(&state.config().paystack, &pending);
    let cart = layout.cart.clone();
    layout.notice = None;

    Ok(CheckoutPayTemplate {
        layout,
        cart,
        total: pending.total().display(),
        reference: pending.reference.clone(),
        email: pending.email.to_string(),
        widget_json: params.to_embedded_json(),
        widget_script: INLINE_SCRIPT_URL,
        nonce,
    }
    .into_response())
}

async fn pending_checkout(session: &Session) -> Option<PendingCheckout> {
    match session
        .get::<PendingCheckout>(session_keys::PENDING_CHECKOUT)
        .await
    {
        Ok(pending) => pending,
        Err(e) => {
            tracing::warn!("Failed to read pending checkout from session: {e}");
            None
        }
    }
}

/// Forget the pending checkout once the payment it describes is settled.
async fn drop_pending(session: &Session) {
    if let Err(e) = session
        .remove::<PendingCheckout>(session_keys::PENDING_CHECKOUT)
        .await
    {
        tracing::warn!("Failed to remove pending checkout from session: {e}");
    }
}

/// The widget reported a successful payment.
#[instrument(skip(state, session, layout, user))]
pub async fn complete(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    layout: Layout,
    Form(form): Form<CompleteForm>,
) -> Result<Response> {
    let pending = pending_checkout(&session).await;
    let flow = CheckoutFlow::new(state.backend(), state.pricing());
    let outcome = PaymentOutcome::Success {
        reference: form.reference.trim().to_string(),
    };

    // A callback that matches no checkout must leave the real one in place.
    let result = flow.complete(&user.auth, pending, outcome).await;
    if result.is_ok() {
        drop_pending(&session).await;
    }

    match result {
        Ok(result @ CheckoutResult::Placed { .. }) => {
            session
                .insert(session_keys::CART_SNAPSHOT, CartSnapshot::default())
                .await?;
            Notice::success("Payment received. Your order has been placed.")
                .flash(&session)
                .await;
            let path = result
                .confirmation_path()
                .unwrap_or_else(|| "/orders".to_string());
            Ok(Redirect::to(&path).into_response())
        }
        Ok(CheckoutResult::OrderFailed { reference }) => Ok((
            StatusCode::BAD_GATEWAY,
            CheckoutFailedTemplate { layout, reference },
        )
            .into_response()),
        Ok(CheckoutResult::Cancelled { .. }) => Ok(Redirect::to("/cart").into_response()),
        Err(e @ (CheckoutError::NoPendingCheckout | CheckoutError::ReferenceMismatch { .. })) => {
            tracing::warn!(error = %e, "Payment callback did not match a checkout");
            Notice::error(
                "We couldn't match that payment to your checkout. If you were charged, \
                 contact support with your payment reference.",
            )
            .flash(&session)
            .await;
            Ok(Redirect::to("/cart").into_response())
        }
        Err(e) => Err(AppError::Checkout(e)),
    }
}

/// The widget was closed without paying.
#[instrument(skip(state, session, user))]
pub async fn cancel(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
) -> Result<Response> {
    let pending = pending_checkout(&session).await;
    let flow = CheckoutFlow::new(state.backend(), state.pricing());
    flow.complete(&user.auth, pending, PaymentOutcome::Cancelled)
        .await?;
    drop_pending(&session).await;

    Notice::info("Payment cancelled. Your cart has not been changed.")
        .flash(&session)
        .await;
    Ok(Redirect::to("/checkout").into_response())
}

#[cfg(test)]
mod tests {
    use agromat_core::UserRole;

    use super::*;
    use crate::backend::{AuthToken, UserAuth};

    #[test]
    fn test_prefilled_form_splits_name() {
        let user = CurrentUser {
            auth: UserAuth {
                user_id: "u1".into(),
                token: AuthToken::new("tok"),
            },
            name: "Ada Ngozi Obi".to_string(),
            email: "ada@farm.ng".to_string(),
            role: UserRole::Buyer,
        };
        let form = prefilled_form(&user);
        assert_eq!(form.first_name, "Ada");
        assert_eq!(form.last_name, "Ngozi Obi");
        assert!(form.city.is_empty());
    }
}
