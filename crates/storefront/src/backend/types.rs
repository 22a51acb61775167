//! Wire types for the AgroMat REST backend.
//!
//! The backend is a Mongo-backed JSON API: camelCase fields, ids under `_id`,
//! and references that are either populated objects or bare id strings
//! depending on the endpoint.

use std::fmt;

use agromat_core::{
    OrderId, OrderStatus, PaymentStatus, PricedLine, ProductId, ProductStatus, UserId, UserRole,
};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// =============================================================================
// Envelopes
// =============================================================================

/// Response wrapper used by some endpoints.
///
/// The payload key differs per endpoint (`payload`, `orders`, `order`, `data`).
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, alias = "payload", alias = "orders", alias = "order")]
    pub data: Option<T>,
}

/// A list answered either bare or wrapped in an [`Envelope`].
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Bare(Vec<T>),
    Wrapped(Envelope<Vec<T>>),
}

impl<T> Listing<T> {
    /// Flatten into the items, treating a missing payload as empty.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Bare(items) => items,
            Self::Wrapped(envelope) => envelope.data.unwrap_or_default(),
        }
    }
}

/// A reference that may or may not have been populated by the backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Ref<T> {
    Populated(T),
    Id(String),
}

impl<T> Ref<T> {
    /// The populated object, if the backend resolved it.
    #[must_use]
    pub const fn populated(&self) -> Option<&T> {
        match self {
            Self::Populated(value) => Some(value),
            Self::Id(_) => None,
        }
    }
}

/// Body of a non-success response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default, alias = "error")]
    pub message: Option<String>,
}

/// Response to a mutation that only reports a message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Auth
// =============================================================================

/// Bearer token issued by `POST /auth/login`.
///
/// Serializes as a plain string so it can live in the server session; never
/// printed by `Debug`.
#[derive(Clone)]
pub struct AuthToken(SecretString);

impl AuthToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    pub(crate) fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken([REDACTED])")
    }
}

impl Serialize for AuthToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.expose())
    }
}

impl<'de> Deserialize<'de> for AuthToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// Identity attached to calls made on behalf of a signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAuth {
    pub user_id: UserId,
    pub token: AuthToken,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// The exact message the backend sends for a successful login.
pub const LOGIN_SUCCESS_MESSAGE: &str = "Login successful";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub token: Option<AuthToken>,
}

/// User object returned by login.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id", default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "role")]
    pub user_type: Option<UserRole>,
}

impl UserProfile {
    /// Best display name: `name`, else first and last name, else the email.
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.trim().to_string();
        }
        let joined = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !joined.is_empty() {
            return joined;
        }
        self.email.clone().unwrap_or_default()
    }
}

// =============================================================================
// Products
// =============================================================================

/// A product listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: Vec<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
    /// Units in stock.
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub sold: u32,
    #[serde(default)]
    pub harvest_date: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub seller_id: Option<Ref<SellerSummary>>,
}

impl Product {
    /// First image, used for cards and cart lines.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.image.first().map(String::as_str)
    }

    /// Seller id whether or not the reference was populated.
    #[must_use]
    pub fn seller(&self) -> Option<&str> {
        match self.seller_id.as_ref()? {
            Ref::Populated(seller) => Some(seller.id.as_str()),
            Ref::Id(id) => Some(id.as_str()),
        }
    }

    /// Seller name, when the backend populated the reference.
    #[must_use]
    pub fn seller_name(&self) -> Option<&str> {
        match self.seller_id.as_ref()? {
            Ref::Populated(seller) => seller.name.as_deref().filter(|n| !n.trim().is_empty()),
            Ref::Id(_) => None,
        }
    }

    /// Whether the listing can be bought right now.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(
            self.status,
            Some(ProductStatus::OutOfStock | ProductStatus::PendingApproval)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerSummary {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
}

/// Body of `POST /products` and `PUT /products/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    pub category: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub location: String,
    pub quantity: u32,
    pub unit: String,
    pub image: Vec<String>,
    pub harvest_date: String,
    pub expiry_date: String,
    pub method: String,
    pub seller_id: UserId,
}

// =============================================================================
// Cart
// =============================================================================

/// The server-side cart.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Cart {
    #[serde(default)]
    pub items: Vec<CartItem>,
}

/// One cart line. `productId` is null once the product is deleted.
#[derive(Debug, Clone, Deserialize)]
pub struct CartItem {
    #[serde(rename = "productId", default)]
    pub product: Option<Ref<Product>>,
    pub quantity: u32,
}

impl CartItem {
    /// The product, when it still exists and was populated.
    #[must_use]
    pub fn live_product(&self) -> Option<&Product> {
        self.product.as_ref().and_then(Ref::populated)
    }
}

impl PricedLine for CartItem {
    fn unit_price(&self) -> Option<Decimal> {
        self.live_product().map(|p| p.price)
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest<'a> {
    pub user_id: &'a UserId,
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

/// Response of `GET /cart/total/:userId`.
#[derive(Debug, Clone, Deserialize)]
pub struct CartTotalResponse {
    #[serde(alias = "totalAmount", alias = "totalPrice")]
    pub total: Decimal,
}

// =============================================================================
// Orders
// =============================================================================

/// An order as returned by the order list endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    #[serde(default)]
    pub user_id: Option<Ref<BuyerSummary>>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub total_amount: Decimal,
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub delivery_instructions: Option<String>,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Order {
    /// Buyer summary when the backend populated it.
    #[must_use]
    pub fn buyer(&self) -> Option<&BuyerSummary> {
        self.user_id.as_ref().and_then(Ref::populated)
    }

    /// Whether this order answers to an id or a payment reference.
    #[must_use]
    pub fn matches_key(&self, key: &str) -> bool {
        self.id.as_str() == key || self.payment_reference.as_deref() == Some(key)
    }

    /// Total units across lines.
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(rename = "productId", default)]
    pub product: Option<Ref<Product>>,
    pub quantity: u32,
    #[serde(default)]
    pub price: Decimal,
}

impl OrderItem {
    /// Product name, or a placeholder when the product was deleted.
    #[must_use]
    pub fn product_name(&self) -> &str {
        self.product
            .as_ref()
            .and_then(Ref::populated)
            .map_or("Removed product", |p| p.name.as_str())
    }

    /// Line total at purchase-time price.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerSummary {
    #[serde(rename = "_id", default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl BuyerSummary {
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.to_string(),
            _ => self.email.clone().unwrap_or_else(|| "Customer".to_string()),
        }
    }
}

/// Body of `POST /orders/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub user_id: UserId,
    pub items: Vec<NewOrderItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub payment_reference: String,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub delivery_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// Minimal view of a freshly created order.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedOrder {
    #[serde(rename = "_id", default)]
    pub id: Option<OrderId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate<'a> {
    pub status: &'a OrderStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyPayment<'a> {
    pub reference: &'a str,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_created_order_envelope() {
        let json = r#"{"message": "Order created", "order": {"_id": "o42", "status": "pending"}}"#;
        let envelope: Envelope<CreatedOrder> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.data.unwrap().id, Some(OrderId::new("o42")));

        let envelope: Envelope<CreatedOrder> =
            serde_json::from_str(r#"{"message": "Order created"}"#).unwrap();
        assert!(envelope.data.is_none());
    }

    #[test]
    fn test_cart_with_deleted_product() {
        let json = r#"{
            "items": [
                {"productId": {"_id": "p1", "name": "Tomatoes", "price": 5.99, "image": ["t.jpg"], "unit": "kg", "category": "vegetables"}, "quantity": 2},
                {"productId": null, "quantity": 4}
            ]
        }"#;
        let cart: Cart = serde_json::from_str(json).unwrap();

        assert_eq!(cart.items.len(), 2);
        assert_eq!(
            cart.items[0].unit_price(),
            Some(Decimal::from_str("5.99").unwrap())
        );
        assert!(cart.items[1].live_product().is_none());
        assert_eq!(cart.items[1].unit_price(), None);
    }

    #[test]
    fn test_unpopulated_cart_reference_is_not_live() {
        let json = r#"{"items": [{"productId": "p1", "quantity": 1}]}"#;
        let cart: Cart = serde_json::from_str(json).unwrap();
        assert!(cart.items[0].live_product().is_none());
    }

    #[test]
    fn test_order_listing_bare_and_wrapped() {
        let order = r#"{"_id": "o1", "items": [], "totalAmount": 22.7, "paymentStatus": "success", "status": "pending"}"#;

        let bare: Listing<Order> = serde_json::from_str(&format!("[{order}]")).unwrap();
        assert_eq!(bare.into_items().len(), 1);

        for key in ["payload", "orders", "data"] {
            let wrapped: Listing<Order> =
                serde_json::from_str(&format!(r#"{{"success": true, "{key}": [{order}]}}"#))
                    .unwrap();
            let items = wrapped.into_items();
            assert_eq!(items.len(), 1, "envelope key {key}");
            assert_eq!(items[0].payment_status, PaymentStatus::Success);
        }

        let empty: Listing<Order> =
            serde_json::from_str(r#"{"success": false, "message": "none"}"#).unwrap();
        assert!(empty.into_items().is_empty());
    }

    #[test]
    fn test_order_matches_id_or_reference() {
        let order: Order = serde_json::from_str(
            r#"{"_id": "o1", "paymentReference": "ORD-1700000000000", "userId": {"_id": "u1", "firstName": "Ada", "lastName": "Obi"}}"#,
        )
        .unwrap();

        assert!(order.matches_key("o1"));
        assert!(order.matches_key("ORD-1700000000000"));
        assert!(!order.matches_key("ORD-1"));
        assert_eq!(order.buyer().unwrap().display_name(), "Ada Obi");
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn test_new_order_wire_format() {
        let order = NewOrder {
            user_id: UserId::new("u1"),
            items: vec![NewOrderItem {
                product_id: ProductId::new("p1"),
                quantity: 2,
                price: Decimal::from_str("5.99").unwrap(),
            }],
            total_amount: Decimal::from_str("22.70").unwrap(),
            payment_reference: "ORD-1".to_string(),
            payment_status: PaymentStatus::Success,
            status: OrderStatus::Pending,
            delivery_address: "1 Farm Rd, Ibadan, Oyo".to_string(),
            delivery_instructions: None,
        };
        let value = serde_json::to_value(&order).unwrap();

        assert_eq!(value["userId"], "u1");
        assert_eq!(value["items"][0]["productId"], "p1");
        assert_eq!(value["items"][0]["price"], 5.99);
        assert_eq!(value["totalAmount"], 22.7);
        assert_eq!(value["paymentReference"], "ORD-1");
        assert_eq!(value["paymentStatus"], "success");
        assert_eq!(value["status"], "pending");
        assert!(value.get("deliveryInstructions").is_none());
    }

    #[test]
    fn test_auth_token_redacted() {
        let auth = UserAuth {
            user_id: UserId::new("u1"),
            token: AuthToken::new("eyJ.secret.token"),
        };
        let debug = format!("{auth:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("REDACTED"));

        let json = serde_json::to_string(&auth).unwrap();
        let back: UserAuth = serde_json::from_str(&json).unwrap();
        assert_eq!(back.token.expose(), "eyJ.secret.token");
    }

    #[test]
    fn test_user_profile_display_name() {
        let profile: UserProfile = serde_json::from_str(
            r#"{"_id": "u1", "firstName": "Ada", "lastName": "Obi", "email": "ada@farm.ng", "userType": "seller"}"#,
        )
        .unwrap();
        assert_eq!(profile.display_name(), "Ada Obi");
        assert_eq!(profile.user_type, Some(UserRole::Seller));
    }

    #[test]
    fn test_product_seller_reference() {
        let populated: Product = serde_json::from_str(
            r#"{"_id": "p1", "name": "Yam", "price": "1200", "sellerId": {"_id": "s1", "name": "Farm"}}"#,
        )
        .unwrap();
        let bare: Product =
            serde_json::from_str(r#"{"_id": "p2", "name": "Okra", "price": 300, "sellerId": "s2"}"#)
                .unwrap();

        assert_eq!(populated.seller(), Some("s1"));
        assert_eq!(bare.seller(), Some("s2"));
        assert!(bare.is_available());
    }
}
