//! End-to-end page flows: the real storefront router in front of the fake
//! marketplace backend, driven by a cookie-keeping client.
//!
//! Run with: cargo test -p agromat-integration-tests

#![allow(clippy::unwrap_used)]

use agromat_integration_tests::{FakeMarketplace, browser, spawn_storefront};
use reqwest::{Client, StatusCode};

struct Site {
    market: FakeMarketplace,
    base: String,
    client: Client,
}

impl Site {
    async fn start() -> Self {
        let market = FakeMarketplace::spawn().await;
        market.add_product("tomato", "Tomatoes", "5.99", 10);
        market.add_product("spinach", "Spinach", "3.49", 10);
        market.register("Ada Obi", "ada@example.com", "harvest123", "buyer");
        let base = spawn_storefront(&market).await;
        Self {
            market,
            base,
            client: browser(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn get(&self, path: &str) -> (StatusCode, String, String) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status();
        let landed = resp.url().path().to_string();
        (status, landed, resp.text().await.unwrap())
    }

    async fn post(&self, path: &str, form: &[(&str, &str)]) -> (StatusCode, String, String) {
        let resp = self
            .client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .unwrap();
        let status = resp.status();
        let landed = resp.url().path().to_string();
        (status, landed, resp.text().await.unwrap())
    }

    async fn log_in(&self) {
        let (status, landed, body) = self
            .post(
                "/auth/login",
                &[("email", "ada@example.com"), ("password", "harvest123")],
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(landed, "/");
        assert!(body.contains("Hi, Ada"));
    }
}

fn checkout_form() -> [(&'static str, &'static str); 8] {
    [
        ("email", "ada@example.com"),
        ("first_name", "Ada"),
        ("last_name", "Obi"),
        ("street", "12 Market Road"),
        ("city", "Ibadan"),
        ("state", "Oyo"),
        ("phone", "+234 803 000 0000"),
        ("instructions", ""),
    ]
}

/// The payment reference embedded in the pay page's widget parameters.
fn reference_in(body: &str) -> String {
    let start = body.find("ORD-").expect("pay page carries a reference");
    body[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect()
}

// ============================================================================
// Public pages
// ============================================================================

#[tokio::test]
async fn test_health_and_catalog_are_public() {
    let site = Site::start().await;

    let (status, _, body) = site.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");

    let (status, _, body) = site.get("/products").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("href=\"/products/tomato\""));
    assert!(body.contains("href=\"/products/spinach\""));

    let (status, _, body) = site.get("/products?q=spin").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("href=\"/products/spinach\""));
    assert!(!body.contains("href=\"/products/tomato\""));

    let (status, _, body) = site.get("/products/tomato").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Green Acres"));
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let site = Site::start().await;
    let (status, _, _) = site.get("/products/no-such-thing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cart_requires_login() {
    let site = Site::start().await;
    let (status, landed, body) = site.get("/cart").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(landed, "/auth/login");
    assert!(body.contains("Log in"));
}

#[tokio::test]
async fn test_wrong_password_rerenders_login() {
    let site = Site::start().await;
    let (status, landed, body) = site
        .post(
            "/auth/login",
            &[("email", "ada@example.com"), ("password", "wrong-password")],
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(landed, "/auth/login");
    assert!(body.contains("Invalid email or password"));
    assert!(!body.contains("Hi, Ada"));
}

#[tokio::test]
async fn test_signup_then_login() {
    let site = Site::start().await;
    let (status, landed, _) = site
        .post(
            "/auth/signup",
            &[
                ("name", "Bola Ade"),
                ("email", "bola@example.com"),
                ("password", "plantain42"),
                ("password_confirm", "plantain42"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(landed, "/auth/login");

    let (_, landed, body) = site
        .post(
            "/auth/login",
            &[("email", "bola@example.com"), ("password", "plantain42")],
        )
        .await;
    assert_eq!(landed, "/");
    assert!(body.contains("Hi, Bola"));
}

// ============================================================================
// Buying
// ============================================================================

#[tokio::test]
async fn test_cart_to_order() {
    let site = Site::start().await;
    site.log_in().await;

    let (_, landed, body) = site
        .post(
            "/cart/add",
            &[("product_id", "tomato"), ("quantity", "2"), ("return_to", "/cart")],
        )
        .await;
    assert_eq!(landed, "/cart");
    assert!(body.contains("Tomatoes"));

    site.post("/cart/add", &[("product_id", "spinach"), ("quantity", "1")])
        .await;

    let (_, _, body) = site.get("/cart").await;
    assert!(body.contains("15.47"), "subtotal");
    assert!(body.contains("22.70"), "total with tax and shipping");

    let (status, _, body) = site.post("/checkout", &checkout_form()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("pk_test_integration"));
    assert!(body.contains("2270"), "amount in minor units");
    let reference = reference_in(&body);
    assert!(site.market.orders().is_empty());

    let (status, landed, body) = site
        .post("/checkout/complete", &[("reference", reference.as_str())])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(landed.starts_with("/orders/"));
    assert!(body.contains(&reference));

    assert_eq!(site.market.orders().len(), 1);
    let (_, _, body) = site.get("/cart").await;
    assert!(body.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_negative_quantity_shows_notice() {
    let site = Site::start().await;
    site.log_in().await;

    let (status, landed, body) = site
        .post("/cart/add", &[("product_id", "tomato"), ("quantity", "-2")])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(landed, "/cart");
    assert!(body.contains("quantity cannot be negative"));
    assert!(site.market.cart_of(&"user-1".into()).is_empty());
    assert!(
        !site
            .market
            .requests()
            .iter()
            .any(|r| r.starts_with("POST /api/cart/add/"))
    );
}

#[tokio::test]
async fn test_checkout_rejects_bad_phone() {
    let site = Site::start().await;
    site.log_in().await;
    site.post("/cart/add", &[("product_id", "tomato"), ("quantity", "1")])
        .await;

    let (status, _, body) = site
        .post(
            "/checkout",
            &[
                ("email", "ada@example.com"),
                ("first_name", "Ada"),
                ("last_name", "Obi"),
                ("street", "12 Market Road"),
                ("city", "Ibadan"),
                ("state", "Oyo"),
                ("phone", "call me"),
                ("instructions", ""),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(!body.contains("paystack-params"));
}

#[tokio::test]
async fn test_forged_completion_creates_no_order() {
    let site = Site::start().await;
    site.log_in().await;
    site.post("/cart/add", &[("product_id", "tomato"), ("quantity", "1")])
        .await;

    let (_, landed, _) = site
        .post("/checkout/complete", &[("reference", "ORD-1")])
        .await;
    assert_eq!(landed, "/cart");
    assert!(site.market.orders().is_empty());
    assert!(
        !site
            .market
            .requests()
            .iter()
            .any(|r| r.starts_with("POST /api/orders"))
    );
}

#[tokio::test]
async fn test_stray_callback_keeps_pending_checkout() {
    let site = Site::start().await;
    site.log_in().await;
    site.post("/cart/add", &[("product_id", "tomato"), ("quantity", "2")])
        .await;

    let (_, _, body) = site.post("/checkout", &checkout_form()).await;
    let reference = reference_in(&body);

    let (_, landed, _) = site
        .post("/checkout/complete", &[("reference", "ORD-1")])
        .await;
    assert_eq!(landed, "/cart");
    assert!(site.market.orders().is_empty());

    let (status, landed, body) = site
        .post("/checkout/complete", &[("reference", reference.as_str())])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(landed.starts_with("/orders/"), "landed on {landed}");
    assert!(body.contains(&reference));
    assert_eq!(site.market.orders().len(), 1);
}

#[tokio::test]
async fn test_buyer_cannot_open_seller_dashboard() {
    let site = Site::start().await;
    site.log_in().await;
    let (status, _, _) = site.get("/seller").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
