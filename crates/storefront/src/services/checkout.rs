//! Checkout and payment flow.
//!
//! 1. [`CheckoutFlow::begin`] re-fetches the cart, prices it, and produces a
//!    [`PendingCheckout`] with a fresh payment reference. The route stores it
//!    in the session and renders the payment widget.
//! 2. The widget reports back with a [`PaymentOutcome`].
//! 3. [`CheckoutFlow::complete`] creates the order only for a successful
//!    payment whose reference matches the pending checkout, then clears the
//!    cart.
//!
//! A failed order creation after a successful payment is not retried. The
//! buyer is told to contact support and quote the reference.

use agromat_core::{
    CartTotals, Email, EmailError, OrderId, OrderStatus, PaymentStatus, Price, PricedLine,
    PricingPolicy,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::backend::{BackendError, CartApi, NewOrder, NewOrderItem, OrderApi, UserAuth};

/// Errors that stop a checkout before or after payment.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("phone number is invalid")]
    InvalidPhone,

    #[error("email is invalid: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("your cart is empty")]
    EmptyCart,

    #[error("order total cannot be charged")]
    AmountOutOfRange,

    #[error("no checkout is awaiting payment")]
    NoPendingCheckout,

    #[error("payment reference {got} does not match pending checkout {expected}")]
    ReferenceMismatch { expected: String, got: String },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl CheckoutError {
    /// Whether the buyer can fix this by editing the form.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingField(_) | Self::InvalidPhone | Self::InvalidEmail(_)
        )
    }
}

// =============================================================================
// Address
// =============================================================================

/// Raw address form as posted.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AddressForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub instructions: String,
}

/// A validated delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub first_name: String,
    pub last_name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub phone: String,
    pub instructions: Option<String>,
}

impl TryFrom<AddressForm> for ShippingAddress {
    type Error = CheckoutError;

    fn try_from(form: AddressForm) -> Result<Self, Self::Error> {
        fn required(value: String, field: &'static str) -> Result<String, CheckoutError> {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(CheckoutError::MissingField(field));
            }
            Ok(trimmed.to_string())
        }

        let phone = required(form.phone, "phone")?;
        let digits = phone.chars().filter(char::is_ascii_digit).count();
        let allowed = phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
        if !allowed || !(7..=15).contains(&digits) {
            return Err(CheckoutError::InvalidPhone);
        }

        let instructions = form.instructions.trim();

        Ok(Self {
            first_name: required(form.first_name, "first name")?,
            last_name: required(form.last_name, "last name")?,
            street: required(form.street, "street address")?,
            city: required(form.city, "city")?,
            state: required(form.state, "state")?,
            phone,
            instructions: (!instructions.is_empty()).then(|| instructions.to_string()),
        })
    }
}

impl ShippingAddress {
    /// Single-line form stored on the order.
    #[must_use]
    pub fn one_line(&self) -> String {
        format!(
            "{} {}, {}, {}, {}. Phone: {}",
            self.first_name, self.last_name, self.street, self.city, self.state, self.phone
        )
    }
}

// =============================================================================
// Pending checkout
// =============================================================================

/// A priced checkout waiting for the payment widget to report back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCheckout {
    pub reference: String,
    pub email: Email,
    pub totals: CartTotals,
    /// `floor(total × 100)`, as the payment widget expects.
    pub amount_minor: i64,
    pub items: Vec<NewOrderItem>,
    pub address: ShippingAddress,
    pub created_at: DateTime<Utc>,
}

impl PendingCheckout {
    #[must_use]
    pub const fn total(&self) -> Price {
        self.totals.total
    }

    fn to_order(&self, auth: &UserAuth) -> NewOrder {
        NewOrder {
            user_id: auth.user_id.clone(),
            items: self.items.clone(),
            total_amount: self.totals.total.amount,
            payment_reference: self.reference.clone(),
            payment_status: PaymentStatus::Success,
            status: OrderStatus::Pending,
            delivery_address: self.address.one_line(),
            delivery_instructions: self.address.instructions.clone(),
        }
    }
}

/// Client-generated payment reference: `ORD-<unix millis>`.
#[must_use]
pub fn payment_reference(now: DateTime<Utc>) -> String {
    format!("ORD-{}", now.timestamp_millis())
}

/// What the payment widget reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Success { reference: String },
    Cancelled,
}

/// Where the buyer ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutResult {
    /// Order created and cart cleared.
    Placed {
        order_id: Option<OrderId>,
        reference: String,
    },
    /// The widget was closed; nothing was created.
    Cancelled { reference: Option<String> },
    /// Payment went through but the order could not be recorded.
    OrderFailed { reference: String },
}

impl CheckoutResult {
    /// Confirmation route: the order id when the backend returned one,
    /// otherwise the payment reference.
    #[must_use]
    pub fn confirmation_path(&self) -> Option<String> {
        match self {
            Self::Placed {
                order_id: Some(id),
                ..
            } => Some(format!("/orders/{}", urlencoding::encode(id.as_str()))),
            Self::Placed {
                order_id: None,
                reference,
            } => Some(format!("/orders/{}", urlencoding::encode(reference))),
            Self::Cancelled { .. } | Self::OrderFailed { .. } => None,
        }
    }
}

// =============================================================================
// Flow
// =============================================================================

pub struct CheckoutFlow<'a, A> {
    api: &'a A,
    pricing: &'a PricingPolicy,
}

impl<'a, A: CartApi + OrderApi> CheckoutFlow<'a, A> {
    #[must_use]
    pub const fn new(api: &'a A, pricing: &'a PricingPolicy) -> Self {
        Self { api, pricing }
    }

    /// Price the current cart and open a pending checkout.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is malformed, the cart cannot be fetched
    /// or is empty, or the total does not fit the widget's amount field.
    #[instrument(skip_all, fields(user_id = %auth.user_id))]
    pub async fn begin(
        &self,
        auth: &UserAuth,
        email: &str,
        address: ShippingAddress,
    ) -> Result<PendingCheckout, CheckoutError> {
        let email = Email::parse(email)?;
        let cart = self.api.fetch_cart(auth).await?;

        let items: Vec<NewOrderItem> = cart
            .items
            .iter()
            .filter_map(|item| {
                let product = item.live_product()?;
                Some(NewOrderItem {
                    product_id: product.id.clone(),
                    quantity: item.quantity(),
                    price: product.price,
                })
            })
            .collect();
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let totals = self.pricing.totals(&cart.items);
        let amount_minor = totals
            .total
            .to_minor_units()
            .filter(|amount| *amount > 0)
            .ok_or(CheckoutError::AmountOutOfRange)?;

        match self.api.cart_total(auth).await {
            Ok(server) if server != totals.subtotal.amount => {
                debug!(client = %totals.subtotal.amount, server = %server, "Backend cart total differs");
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Backend cart total unavailable"),
        }

        let now = Utc::now();
        let pending = PendingCheckout {
            reference: payment_reference(now),
            email,
            totals,
            amount_minor,
            items,
            address,
            created_at: now,
        };

        info!(
            reference = %pending.reference,
            total = %pending.total(),
            "Checkout started"
        );
        Ok(pending)
    }

    /// Act on the payment widget's report.
    ///
    /// # Errors
    ///
    /// Returns an error for a success report with no pending checkout or a
    /// reference that does not match it. No order call is made in either case.
    #[instrument(skip_all, fields(user_id = %auth.user_id))]
    pub async fn complete(
        &self,
        auth: &UserAuth,
        pending: Option<PendingCheckout>,
        outcome: PaymentOutcome,
    ) -> Result<CheckoutResult, CheckoutError> {
        let reference = match outcome {
            PaymentOutcome::Cancelled => {
                let reference = pending.map(|p| p.reference);
                info!(reference = ?reference, "Payment cancelled");
                return Ok(CheckoutResult::Cancelled { reference });
            }
            PaymentOutcome::Success { reference } => reference,
        };

        let pending = pending.ok_or(CheckoutError::NoPendingCheckout)?;
        if pending.reference != reference {
            warn!(expected = %pending.reference, got = %reference, "Payment reference mismatch");
            return Err(CheckoutError::ReferenceMismatch {
                expected: pending.reference,
                got: reference,
            });
        }

        let order = pending.to_order(auth);
        let created = match self.api.create_order(auth, &order).await {
            Ok(created) => created,
            Err(e) => {
                error!(
                    error = %e,
                    reference = %reference,
                    "Order creation failed after successful payment"
                );
                return Ok(CheckoutResult::OrderFailed { reference });
            }
        };

        if let Err(e) = self.api.clear_cart(auth).await {
            warn!(error = %e, reference = %reference, "Failed to clear cart after order");
        }

        info!(reference = %reference, order_id = ?created.id, "Order placed");
        Ok(CheckoutResult::Placed {
            order_id: created.id,
            reference,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::TimeZone;
    use rust_decimal::Decimal;

    use super::*;
    use crate::services::cart::tests::{FakeBackend, auth};

    fn form() -> AddressForm {
        AddressForm {
            first_name: "Ada".to_string(),
            last_name: "Obi".to_string(),
            street: "12 Market Road".to_string(),
            city: "Ibadan".to_string(),
            state: "Oyo".to_string(),
            phone: "+234 803 000 0000".to_string(),
            instructions: "  ".to_string(),
        }
    }

    fn address() -> ShippingAddress {
        ShippingAddress::try_from(form()).unwrap()
    }

    fn basket() -> FakeBackend {
        FakeBackend::with_lines(&[
            ("tomato", "Tomatoes", "5.99", 2),
            ("spinach", "Spinach", "3.49", 1),
        ])
    }

    #[test]
    fn test_address_validation() {
        let address = address();
        assert_eq!(address.instructions, None);
        assert_eq!(
            address.one_line(),
            "Ada Obi, 12 Market Road, Ibadan, Oyo. Phone: +234 803 000 0000"
        );

        let missing_city = AddressForm {
            city: " ".to_string(),
            ..form()
        };
        assert!(matches!(
            ShippingAddress::try_from(missing_city),
            Err(CheckoutError::MissingField("city"))
        ));

        for phone in ["12345", "080-CALL-ME", "+234 803 000 0000 0000 00"] {
            let bad = AddressForm {
                phone: phone.to_string(),
                ..form()
            };
            let err = ShippingAddress::try_from(bad).unwrap_err();
            assert!(matches!(err, CheckoutError::InvalidPhone), "{phone}");
            assert!(err.is_validation());
        }
    }

    #[test]
    fn test_payment_reference_format() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(payment_reference(now), "ORD-1700000000123");
    }

    #[tokio::test]
    async fn test_begin_prices_cart() {
        let fake = basket();
        let policy = PricingPolicy::default();
        let flow = CheckoutFlow::new(&fake, &policy);

        let pending = flow.begin(&auth(), "ada@farm.ng", address()).await.unwrap();

        assert!(pending.reference.starts_with("ORD-"));
        assert_eq!(pending.total().amount, Decimal::new(2270, 2));
        assert_eq!(pending.amount_minor, 2270);
        assert_eq!(pending.items.len(), 2);
        assert_eq!(pending.items[0].quantity, 2);
        assert!(fake.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_begin_rejects_empty_cart() {
        let fake = FakeBackend::default();
        let policy = PricingPolicy::default();
        let flow = CheckoutFlow::new(&fake, &policy);

        let err = flow
            .begin(&auth(), "ada@farm.ng", address())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
    }

    #[tokio::test]
    async fn test_begin_rejects_bad_email() {
        let fake = basket();
        let policy = PricingPolicy::default();
        let flow = CheckoutFlow::new(&fake, &policy);

        let err = flow.begin(&auth(), "ada", address()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidEmail(_)));
        assert_eq!(fake.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success_creates_order_then_clears_cart() {
        let fake = basket();
        let policy = PricingPolicy::default();
        let flow = CheckoutFlow::new(&fake, &policy);
        let pending = flow.begin(&auth(), "ada@farm.ng", address()).await.unwrap();
        let reference = pending.reference.clone();

        let result = flow
            .complete(
                &auth(),
                Some(pending),
                PaymentOutcome::Success {
                    reference: reference.clone(),
                },
            )
            .await
            .unwrap();

        assert_eq!(result.confirmation_path().as_deref(), Some("/orders/order-42"));
        let orders = fake.orders.lock().unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].payment_reference, reference);
        assert_eq!(orders[0].payment_status, PaymentStatus::Success);
        assert_eq!(orders[0].status, OrderStatus::Pending);
        assert_eq!(orders[0].total_amount, Decimal::new(2270, 2));
        assert!(orders[0].delivery_address.contains("Ibadan"));
        assert_eq!(fake.clears.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_makes_no_order_call() {
        let fake = basket();
        let policy = PricingPolicy::default();
        let flow = CheckoutFlow::new(&fake, &policy);
        let pending = flow.begin(&auth(), "ada@farm.ng", address()).await.unwrap();
        let mutations_before = fake.mutations.load(Ordering::SeqCst);

        let result = flow
            .complete(&auth(), Some(pending.clone()), PaymentOutcome::Cancelled)
            .await
            .unwrap();

        assert_eq!(
            result,
            CheckoutResult::Cancelled {
                reference: Some(pending.reference)
            }
        );
        assert!(fake.orders.lock().unwrap().is_empty());
        assert_eq!(fake.mutations.load(Ordering::SeqCst), mutations_before);
    }

    #[tokio::test]
    async fn test_reference_mismatch_makes_no_order_call() {
        let fake = basket();
        let policy = PricingPolicy::default();
        let flow = CheckoutFlow::new(&fake, &policy);
        let pending = flow.begin(&auth(), "ada@farm.ng", address()).await.unwrap();

        let err = flow
            .complete(
                &auth(),
                Some(pending),
                PaymentOutcome::Success {
                    reference: "ORD-1".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::ReferenceMismatch { .. }));
        assert!(fake.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_success_without_pending_checkout() {
        let fake = basket();
        let policy = PricingPolicy::default();
        let flow = CheckoutFlow::new(&fake, &policy);

        let err = flow
            .complete(
                &auth(),
                None,
                PaymentOutcome::Success {
                    reference: "ORD-1".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::NoPendingCheckout));
        assert!(fake.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_order_failure_keeps_cart() {
        let fake = basket();
        fake.fail_orders.store(true, Ordering::SeqCst);
        let policy = PricingPolicy::default();
        let flow = CheckoutFlow::new(&fake, &policy);
        let pending = flow.begin(&auth(), "ada@farm.ng", address()).await.unwrap();
        let reference = pending.reference.clone();

        let result = flow
            .complete(
                &auth(),
                Some(pending),
                PaymentOutcome::Success {
                    reference: reference.clone(),
                },
            )
            .await
            .unwrap();

        assert_eq!(result, CheckoutResult::OrderFailed { reference });
        assert_eq!(result.confirmation_path(), None);
        assert_eq!(fake.orders.lock().unwrap().len(), 1);
        assert_eq!(fake.clears.load(Ordering::SeqCst), 0);
        assert_eq!(fake.lines.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_confirmation_falls_back_to_reference() {
        let result = CheckoutResult::Placed {
            order_id: None,
            reference: "ORD-1700000000123".to_string(),
        };
        assert_eq!(
            result.confirmation_path().as_deref(),
            Some("/orders/ORD-1700000000123")
        );
    }
}
