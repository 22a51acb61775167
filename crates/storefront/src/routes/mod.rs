//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Landing page
//! GET  /health                        - Health check
//!
//! # Catalog
//! GET  /products                      - Product listing (?category, ?max_price, ?q)
//! GET  /products/{id}                 - Product detail
//!
//! # Cart (login required)
//! GET  /cart                          - Cart page
//! POST /cart/add                      - Add to cart, back to the posting page
//! POST /cart/update                   - Set a line's quantity
//! POST /cart/remove                   - Remove a line
//! POST /cart/clear                    - Empty the cart
//! GET  /cart/preview                  - Navigation preview fragment
//!
//! # Checkout (login required)
//! GET  /checkout                      - Address form
//! POST /checkout                      - Open a pending checkout, show the pay page
//! POST /checkout/complete             - Payment widget success callback
//! POST /checkout/cancel               - Payment widget closed
//!
//! # Orders (login required)
//! GET  /orders                        - Order history
//! GET  /orders/{key}                  - Order detail by id or payment reference
//!
//! # Auth
//! GET  /auth/login                    - Login page
//! POST /auth/login                    - Login action (rate limited)
//! GET  /auth/signup                   - Signup page
//! POST /auth/signup                   - Signup action (rate limited)
//! POST /auth/logout                   - Logout action
//!
//! # Seller dashboard (sellers and admins)
//! GET  /seller                        - Overview
//! GET  /seller/products/new           - New listing form
//! POST /seller/products               - Create listing
//! GET  /seller/products/{id}/edit     - Edit listing form
//! POST /seller/products/{id}          - Update listing
//! POST /seller/products/{id}/delete   - Delete listing
//! POST /seller/orders/{id}/status     - Change order status
//!
//! # Admin console (admins)
//! GET  /admin                         - All orders with analytics
//! POST /admin/orders/{id}/status      - Change order status
//! POST /admin/orders/{id}/verify      - Verify an order's payment
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod orders;
pub mod products;
pub mod seller;
pub mod views;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Accept a return path only if it stays on this site.
#[must_use]
pub fn local_path(path: &str) -> Option<&str> {
    let path = path.trim();
    let local = path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !path.chars().any(char::is_control);
    local.then_some(path)
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let form_posts = Router::new()
        .route("/login", post(auth::login))
        .route("/signup", post(auth::signup))
        .route_layer(auth_rate_limiter());

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/signup", get(auth::signup_page))
        .route("/logout", post(auth::logout))
        .merge(form_posts)
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/preview", get(cart::preview))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::begin))
        .route("/complete", post(checkout::complete))
        .route("/cancel", post(checkout::cancel))
}

/// Create the order history routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{key}", get(orders::show))
}

/// Create the seller dashboard routes router.
pub fn seller_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(seller::index))
        .route("/products", post(seller::create_product))
        .route("/products/new", get(seller::new_product))
        .route("/products/{id}", post(seller::update_product))
        .route("/products/{id}/edit", get(seller::edit_product))
        .route("/products/{id}/delete", post(seller::delete_product))
        .route("/orders/{id}/status", post(seller::update_order_status))
}

/// Create the admin console routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::index))
        .route("/orders/{id}/status", post(admin::update_order_status))
        .route("/orders/{id}/verify", post(admin::verify_payment))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/orders", order_routes())
        .nest("/auth", auth_routes())
        .nest("/seller", seller_routes())
        .nest("/admin", admin_routes())
}

/// Health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the backend.
async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_path() {
        assert_eq!(local_path("/cart"), Some("/cart"));
        assert_eq!(local_path(" /products?q=yam "), Some("/products?q=yam"));
        assert_eq!(local_path("//evil.example"), None);
        assert_eq!(local_path("https://evil.example"), None);
        assert_eq!(local_path("/\\evil.example"), None);
        assert_eq!(local_path("/a\nb"), None);
        assert_eq!(local_path(""), None);
    }
}
