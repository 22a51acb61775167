//! Business logic services for storefront.
//!
//! # Services
//!
//! - `cart` - Cart synchronization with the backend (refetch after mutate)
//! - `checkout` - Pending checkout, payment outcome, order creation
//! - `paystack` - Payment widget parameters
//! - `catalog` - Product filtering for the catalog pages
//! - `seller` - Listing form validation and seller figures
//! - `analytics` - Admin order figures

pub mod analytics;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod paystack;
pub mod seller;

pub use cart::{CartState, CartSync};
pub use checkout::{CheckoutError, CheckoutFlow, CheckoutResult, PaymentOutcome, PendingCheckout};
