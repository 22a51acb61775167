//! AgroMat Core - Shared types library.
//!
//! This crate provides the types used across the AgroMat storefront:
//! - `storefront` - Server-rendered marketplace (catalog, cart, checkout,
//!   seller dashboard, admin console)
//! - `integration-tests` - End-to-end tests against a fake backend
//!
//! # Architecture
//!
//! The core crate contains only types and pure computations - no I/O, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, quantities, emails, and statuses
//! - [`pricing`] - The cart pricing policy (subtotal, tax, shipping, total)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod types;

pub use pricing::{CartTotals, PricedLine, PricingPolicy};
pub use types::*;
