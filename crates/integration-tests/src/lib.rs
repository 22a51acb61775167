//! Test harness for the AgroMat storefront.
//!
//! [`FakeMarketplace`] stands in for the marketplace REST backend: users,
//! products, carts, and orders live in memory and are served by axum on an
//! ephemeral port, with the same paths, envelopes, and bearer checks the real
//! backend uses. [`spawn_storefront`] boots the real storefront router against
//! it so tests can drive pages with a cookie-keeping client.
//!
//! Every request the fake receives is recorded as `"METHOD /path"` so tests can
//! assert which calls were (or were not) made.

#![allow(clippy::expect_used, clippy::missing_panics_doc, clippy::unwrap_used)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use agromat_core::{CurrencyCode, PricingPolicy, UserId};
use agromat_storefront::backend::{AuthToken, BackendClient, UserAuth};
use agromat_storefront::config::{BackendConfig, PaystackConfig, StorefrontConfig};
use agromat_storefront::middleware;
use agromat_storefront::routes;
use agromat_storefront::state::AppState;
use axum::extract::{Path, Query, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

/// Seller that owns every product added through [`FakeMarketplace::add_product`].
pub const SELLER_ID: &str = "seller-1";

type Shared = Arc<Mutex<Marketplace>>;
type Handled = Result<Json<Value>, Response>;

// =============================================================================
// Marketplace state
// =============================================================================

#[derive(Debug, Clone)]
struct FakeProduct {
    id: String,
    name: String,
    price: Decimal,
    stock: u32,
    seller_id: String,
}

impl FakeProduct {
    fn to_json(&self) -> Value {
        json!({
            "_id": self.id,
            "name": self.name,
            "price": self.price.to_f64(),
            "image": [format!("/static/img/{}.jpg", self.id)],
            "unit": "kg",
            "category": "vegetables",
            "description": format!("Fresh {} from the farm", self.name.to_lowercase()),
            "location": "Ibadan",
            "quantity": self.stock,
            "sold": 0,
            "sellerId": {"_id": self.seller_id, "name": "Green Acres"},
        })
    }
}

#[derive(Debug, Clone)]
struct FakeUser {
    id: String,
    name: String,
    email: String,
    password: String,
    role: &'static str,
}

#[derive(Debug, Default)]
struct Marketplace {
    users: Vec<FakeUser>,
    products: Vec<FakeProduct>,
    carts: HashMap<String, Vec<(String, u32)>>,
    orders: Vec<Value>,
    requests: Vec<String>,
    failing_cart_mutations: bool,
    failing_orders: bool,
    next_id: u32,
}

impl Marketplace {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn register(&mut self, name: &str, email: &str, password: &str, role: &'static str) -> String {
        let id = self.next_id("user");
        self.users.push(FakeUser {
            id: id.clone(),
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role,
        });
        id
    }

    fn product(&self, id: &str) -> Option<&FakeProduct> {
        self.products.iter().find(|p| p.id == id)
    }

    fn role_of(&self, user_id: &str) -> Option<&'static str> {
        self.users.iter().find(|u| u.id == user_id).map(|u| u.role)
    }

    fn cart_json(&self, user_id: &str) -> Value {
        let items: Vec<Value> = self
            .carts
            .get(user_id)
            .into_iter()
            .flatten()
            .map(|(product_id, quantity)| {
                let product = self.product(product_id).map(FakeProduct::to_json);
                json!({"productId": product, "quantity": quantity})
            })
            .collect();
        json!({"items": items})
    }

    fn cart_total(&self, user_id: &str) -> Decimal {
        self.carts
            .get(user_id)
            .into_iter()
            .flatten()
            .filter_map(|(product_id, quantity)| {
                self.product(product_id)
                    .map(|p| p.price * Decimal::from(*quantity))
            })
            .sum()
    }

    fn set_line(&mut self, user_id: &str, product_id: &str, quantity: u32) -> Result<(), &'static str> {
        let stock = self.product(product_id).ok_or("Product not found")?.stock;
        if quantity > stock {
            return Err("Insufficient stock");
        }
        let lines = self.carts.entry(user_id.to_string()).or_default();
        match lines.iter_mut().find(|(id, _)| id == product_id) {
            Some(line) => line.1 = quantity,
            None => lines.push((product_id.to_string(), quantity)),
        }
        Ok(())
    }

    fn quantity_in_cart(&self, user_id: &str, product_id: &str) -> u32 {
        self.carts
            .get(user_id)
            .and_then(|lines| lines.iter().find(|(id, _)| id == product_id))
            .map_or(0, |(_, quantity)| *quantity)
    }

    /// An order with its item references populated, as the list endpoints answer.
    fn order_json(&self, order: &Value) -> Value {
        let mut order = order.clone();
        if let Some(items) = order.get_mut("items").and_then(Value::as_array_mut) {
            for item in items {
                let product = item
                    .get("productId")
                    .and_then(Value::as_str)
                    .and_then(|id| self.product(id))
                    .map(FakeProduct::to_json);
                if let Some(product) = product {
                    item["productId"] = product;
                }
            }
        }
        order
    }

    fn orders_where(&self, keep: impl Fn(&Value) -> bool) -> Value {
        let orders: Vec<Value> = self
            .orders
            .iter()
            .filter(|order| keep(order))
            .map(|order| self.order_json(order))
            .collect();
        json!({"success": true, "orders": orders})
    }

    fn sells_in(&self, order: &Value, seller_id: &str) -> bool {
        order
            .get("items")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|item| item.get("productId").and_then(Value::as_str))
            .filter_map(|id| self.product(id))
            .any(|product| product.seller_id == seller_id)
    }

    fn order_mut(&mut self, id: &str) -> Option<&mut Value> {
        self.orders
            .iter_mut()
            .find(|order| order.get("_id").and_then(Value::as_str) == Some(id))
    }
}

// =============================================================================
// FakeMarketplace
// =============================================================================

/// In-process marketplace backend bound to an ephemeral port.
#[derive(Clone)]
pub struct FakeMarketplace {
    addr: SocketAddr,
    state: Shared,
}

impl FakeMarketplace {
    /// Start the fake backend on `127.0.0.1` with an OS-assigned port.
    pub async fn spawn() -> Self {
        let state: Shared = Arc::new(Mutex::new(Marketplace::default()));
        let app = backend_router(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Fake backend has no address");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Fake backend stopped");
        });

        Self { addr, state }
    }

    /// Base URL the storefront should use, with the `/api/` prefix.
    #[must_use]
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/api/", self.addr)).expect("Fake backend URL is valid")
    }

    #[must_use]
    pub fn config(&self) -> BackendConfig {
        BackendConfig {
            base_url: self.base_url(),
            timeout: Duration::from_secs(5),
        }
    }

    /// A fresh backend client (empty product cache) pointed at this fake.
    #[must_use]
    pub fn client(&self) -> BackendClient {
        BackendClient::new(&self.config()).expect("Failed to build backend client")
    }

    fn lock(&self) -> MutexGuard<'_, Marketplace> {
        self.state.lock().expect("Marketplace lock poisoned")
    }

    /// List a product owned by [`SELLER_ID`].
    pub fn add_product(&self, id: &str, name: &str, price: &str, stock: u32) {
        self.lock().products.push(FakeProduct {
            id: id.to_string(),
            name: name.to_string(),
            price: price.parse().expect("Product price is a decimal"),
            stock,
            seller_id: SELLER_ID.to_string(),
        });
    }

    /// Delete a product; cart lines pointing at it come back with a null product.
    pub fn remove_product(&self, id: &str) {
        self.lock().products.retain(|p| p.id != id);
    }

    /// Register a user and return their id.
    pub fn register(&self, name: &str, email: &str, password: &str, role: &'static str) -> UserId {
        UserId::new(self.lock().register(name, email, password, role))
    }

    /// Credentials the backend accepts for this user.
    #[must_use]
    pub fn auth_for(&self, user_id: &UserId) -> UserAuth {
        UserAuth {
            user_id: user_id.clone(),
            token: AuthToken::new(token_for(user_id.as_str())),
        }
    }

    /// Put a line straight into a user's cart, bypassing the API.
    pub fn put_in_cart(&self, user_id: &UserId, product_id: &str, quantity: u32) {
        self.lock()
            .set_line(user_id.as_str(), product_id, quantity)
            .expect("Seeded cart line is valid");
    }

    /// The user's cart as `(product id, quantity)` pairs.
    #[must_use]
    pub fn cart_of(&self, user_id: &UserId) -> Vec<(String, u32)> {
        self.lock()
            .carts
            .get(user_id.as_str())
            .cloned()
            .unwrap_or_default()
    }

    /// Order bodies as received, plus the assigned `_id`.
    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        self.lock().orders.clone()
    }

    /// Every request received so far, as `"METHOD /path"`.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    /// Answer every cart mutation with a 503 until switched back.
    pub fn fail_cart_mutations(&self, failing: bool) {
        self.lock().failing_cart_mutations = failing;
    }

    /// Answer order creation with a 503 until switched back.
    pub fn fail_orders(&self, failing: bool) {
        self.lock().failing_orders = failing;
    }
}

fn token_for(user_id: &str) -> String {
    format!("token-{user_id}")
}

// =============================================================================
// Backend routes
// =============================================================================

fn backend_router(state: Shared) -> Router {
    let api = Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/products", get(products))
        .route("/cart", get(cart))
        .route("/cart/add/{user_id}", post(add_to_cart))
        .route(
            "/cart/update/{user_id}/{product_id}/{quantity}",
            put(update_cart),
        )
        .route("/cart/clear/{user_id}", delete(clear_cart))
        .route("/cart/total/{user_id}", get(cart_total))
        .route("/cart/{user_id}/{product_id}", delete(remove_from_cart))
        .route("/orders/", get(all_orders).post(create_order))
        .route("/orders/user/{user_id}", get(user_orders))
        .route("/orders/seller/{seller_id}", get(seller_orders))
        .route("/orders/{id}/status", put(set_order_status))
        .route("/orders/{id}/verify", put(verify_payment));

    Router::new()
        .nest("/api", api)
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            record_request,
        ))
        .with_state(state)
}

async fn record_request(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let line = format!("{} {}", request.method(), request.uri().path());
    state.lock().expect("Marketplace lock poisoned").requests.push(line);
    next.run(request).await
}

fn lock(state: &Shared) -> MutexGuard<'_, Marketplace> {
    state.lock().expect("Marketplace lock poisoned")
}

fn rejected(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"success": false, "message": message}))).into_response()
}

fn unavailable() -> Response {
    rejected(StatusCode::SERVICE_UNAVAILABLE, "Service temporarily unavailable")
}

fn ok(message: &str) -> Handled {
    Ok(Json(json!({"success": true, "message": message})))
}

/// The user id behind the bearer token, if any.
fn bearer_user(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer token-")
        .map(str::to_string)
}

fn authorize(headers: &HeaderMap, user_id: &str) -> Result<(), Response> {
    match bearer_user(headers) {
        Some(caller) if caller == user_id => Ok(()),
        _ => Err(rejected(StatusCode::UNAUTHORIZED, "Not authorized")),
    }
}

#[derive(Deserialize)]
struct SignupBody {
    name: String,
    email: String,
    password: String,
}

async fn signup(State(state): State<Shared>, Json(body): Json<SignupBody>) -> Handled {
    let mut market = lock(&state);
    if market.users.iter().any(|u| u.email == body.email) {
        return Err(rejected(StatusCode::BAD_REQUEST, "User already exists"));
    }
    let id = market.register(&body.name, &body.email, &body.password, "buyer");
    Ok(Json(json!({"message": "User registered successfully", "userId": id})))
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(State(state): State<Shared>, Json(body): Json<LoginBody>) -> Handled {
    let market = lock(&state);
    let user = market
        .users
        .iter()
        .find(|u| u.email == body.email && u.password == body.password)
        .ok_or_else(|| rejected(StatusCode::BAD_REQUEST, "Invalid email or password"))?;

    Ok(Json(json!({
        "message": "Login successful",
        "token": token_for(&user.id),
        "userId": user.id,
        "user": {
            "_id": user.id,
            "name": user.name,
            "email": user.email,
            "userType": user.role,
        },
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductQuery {
    seller_id: Option<String>,
}

async fn products(State(state): State<Shared>, Query(query): Query<ProductQuery>) -> Json<Value> {
    let market = lock(&state);
    let products: Vec<Value> = market
        .products
        .iter()
        .filter(|p| query.seller_id.as_deref().is_none_or(|s| p.seller_id == s))
        .map(FakeProduct::to_json)
        .collect();
    Json(json!({"success": true, "payload": products}))
}

#[derive(Deserialize)]
struct CartQuery {
    #[serde(rename = "userId")]
    user_id: String,
}

async fn cart(State(state): State<Shared>, headers: HeaderMap, Query(query): Query<CartQuery>) -> Handled {
    authorize(&headers, &query.user_id)?;
    Ok(Json(lock(&state).cart_json(&query.user_id)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddBody {
    product_id: String,
    quantity: u32,
}

async fn add_to_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Json(body): Json<AddBody>,
) -> Handled {
    authorize(&headers, &user_id)?;
    let mut market = lock(&state);
    if market.failing_cart_mutations {
        return Err(unavailable());
    }
    let quantity = market.quantity_in_cart(&user_id, &body.product_id) + body.quantity;
    market
        .set_line(&user_id, &body.product_id, quantity)
        .map_err(|message| rejected(StatusCode::BAD_REQUEST, message))?;
    ok("Item added to cart")
}

async fn update_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((user_id, product_id, quantity)): Path<(String, String, u32)>,
) -> Handled {
    authorize(&headers, &user_id)?;
    let mut market = lock(&state);
    if market.failing_cart_mutations {
        return Err(unavailable());
    }
    market
        .set_line(&user_id, &product_id, quantity)
        .map_err(|message| rejected(StatusCode::BAD_REQUEST, message))?;
    ok("Cart updated")
}

async fn remove_from_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((user_id, product_id)): Path<(String, String)>,
) -> Handled {
    authorize(&headers, &user_id)?;
    let mut market = lock(&state);
    if market.failing_cart_mutations {
        return Err(unavailable());
    }
    if let Some(lines) = market.carts.get_mut(&user_id) {
        lines.retain(|(id, _)| *id != product_id);
    }
    ok("Item removed from cart")
}

async fn clear_cart(State(state): State<Shared>, headers: HeaderMap, Path(user_id): Path<String>) -> Handled {
    authorize(&headers, &user_id)?;
    let mut market = lock(&state);
    if market.failing_cart_mutations {
        return Err(unavailable());
    }
    market.carts.remove(&user_id);
    ok("Cart cleared")
}

async fn cart_total(State(state): State<Shared>, headers: HeaderMap, Path(user_id): Path<String>) -> Handled {
    authorize(&headers, &user_id)?;
    let total = lock(&state).cart_total(&user_id);
    Ok(Json(json!({"total": total.to_f64()})))
}

async fn create_order(State(state): State<Shared>, headers: HeaderMap, Json(mut body): Json<Value>) -> Handled {
    let user_id = body
        .get("userId")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    authorize(&headers, &user_id)?;

    let mut market = lock(&state);
    if market.failing_orders {
        return Err(unavailable());
    }
    let id = market.next_id("order");
    if let Some(order) = body.as_object_mut() {
        order.insert("_id".to_string(), json!(id));
        order.insert("createdAt".to_string(), json!("2026-03-14T09:30:00Z"));
    }
    market.orders.push(body);

    Ok(Json(json!({"success": true, "message": "Order created", "order": {"_id": id}})))
}

async fn all_orders(State(state): State<Shared>, headers: HeaderMap) -> Handled {
    let caller = bearer_user(&headers).ok_or_else(|| rejected(StatusCode::UNAUTHORIZED, "Not authorized"))?;
    let market = lock(&state);
    if market.role_of(&caller) != Some("admin") {
        return Err(rejected(StatusCode::FORBIDDEN, "Admins only"));
    }
    Ok(Json(market.orders_where(|_| true)))
}

async fn user_orders(State(state): State<Shared>, headers: HeaderMap, Path(user_id): Path<String>) -> Handled {
    authorize(&headers, &user_id)?;
    let market = lock(&state);
    Ok(Json(market.orders_where(|order| {
        order.get("userId").and_then(Value::as_str) == Some(user_id.as_str())
    })))
}

async fn seller_orders(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(seller_id): Path<String>,
) -> Handled {
    bearer_user(&headers).ok_or_else(|| rejected(StatusCode::UNAUTHORIZED, "Not authorized"))?;
    let market = lock(&state);
    Ok(Json(market.orders_where(|order| market.sells_in(order, &seller_id))))
}

#[derive(Deserialize)]
struct StatusBody {
    status: String,
}

async fn set_order_status(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Handled {
    bearer_user(&headers).ok_or_else(|| rejected(StatusCode::UNAUTHORIZED, "Not authorized"))?;
    let mut market = lock(&state);
    let order = market
        .order_mut(&id)
        .ok_or_else(|| rejected(StatusCode::NOT_FOUND, "Order not found"))?;
    order["status"] = json!(body.status);
    ok("Order status updated")
}

#[derive(Deserialize)]
struct VerifyBody {
    reference: String,
}

async fn verify_payment(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<VerifyBody>,
) -> Handled {
    bearer_user(&headers).ok_or_else(|| rejected(StatusCode::UNAUTHORIZED, "Not authorized"))?;
    let mut market = lock(&state);
    let order = market
        .order_mut(&id)
        .ok_or_else(|| rejected(StatusCode::NOT_FOUND, "Order not found"))?;
    if order.get("paymentReference").and_then(Value::as_str) != Some(body.reference.as_str()) {
        return Err(rejected(StatusCode::BAD_REQUEST, "Reference does not match this order"));
    }
    order["paymentStatus"] = json!("success");
    ok("Payment verified")
}

// =============================================================================
// Storefront
// =============================================================================

/// Boot the storefront against `backend` and return its base URL.
///
/// The middleware stack matches the binary's, minus Sentry and request tracing.
pub async fn spawn_storefront(backend: &FakeMarketplace) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind storefront");
    let addr = listener.local_addr().expect("Storefront has no address");

    let config = StorefrontConfig {
        host: addr.ip(),
        port: addr.port(),
        base_url: format!("http://{addr}"),
        session_secret: SecretString::from("integration-tests-session-secret-0123456789".to_string()),
        backend: backend.config(),
        paystack: PaystackConfig {
            public_key: "pk_test_integration".to_string(),
            currency: CurrencyCode::NGN,
        },
        pricing: PricingPolicy::default(),
        sentry_dsn: None,
        sentry_environment: None,
    };

    let session_layer =
        middleware::create_session_layer(&config).expect("Failed to derive session key");
    let state = AppState::new(config).expect("Failed to build app state");

    let app = Router::new()
        .merge(routes::routes())
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(session_layer)
        .layer(axum::middleware::from_fn(middleware::csp_nonce_middleware))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .with_state(state);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Storefront stopped");
    });

    format!("http://{addr}")
}

/// A client that keeps the session cookie and follows redirects.
#[must_use]
pub fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}
