//! Paystack inline widget parameters.
//!
//! The widget is loaded from `https://js.paystack.co/v1/inline.js` and set up
//! by `static/js/checkout.js` from the JSON rendered here.

use serde::Serialize;

use super::checkout::PendingCheckout;
use crate::config::PaystackConfig;

/// Inline script origin, also allowed by the CSP.
pub const INLINE_SCRIPT_URL: &str = "https://js.paystack.co/v1/inline.js";

/// Arguments for `PaystackPop.setup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WidgetParams {
    pub key: String,
    pub email: String,
    /// Minor currency units (kobo for NGN).
    pub amount: i64,
    pub currency: &'static str,
    #[serde(rename = "ref")]
    pub reference: String,
}

impl WidgetParams {
    #[must_use]
    pub fn new(config: &PaystackConfig, pending: &PendingCheckout) -> Self {
        Self {
            key: config.public_key.clone(),
            email: pending.email.to_string(),
            amount: pending.amount_minor,
            currency: pending.totals.total.currency_code.code(),
            reference: pending.reference.clone(),
        }
    }

    /// JSON for embedding in a `<script type="application/json">` block.
    ///
    /// `<` is escaped so the payload cannot close the script element.
    #[must_use]
    pub fn to_embedded_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| "{}".to_string())
            .replace('<', "\\u003c")
    }
}
