//! Type-safe price representation using decimal arithmetic.
//!
//! Amounts are held in the currency's standard unit (naira, dollars) as a
//! [`Decimal`]. The payment widget wants minor units (kobo, cents), which
//! [`Price::to_minor_units`] derives.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., naira, not kobo).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Round to two decimal places, midpoints away from zero.
    #[must_use]
    pub fn rounded(self) -> Self {
        Self::new(round_cents(self.amount), self.currency_code)
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Amount in minor units, truncated toward negative infinity.
    ///
    /// Returns `None` if the amount does not fit in an `i64`.
    #[must_use]
    pub fn to_minor_units(&self) -> Option<i64> {
        (self.amount * Decimal::ONE_HUNDRED).floor().to_i64()
    }

    /// Format for display (e.g., "₦15.47").
    #[must_use]
    pub fn display(&self) -> String {
        format!(
            "{}{:.2}",
            self.currency_code.symbol(),
            round_cents(self.amount)
        )
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

/// Round a decimal amount to cents the way receipts do.
#[must_use]
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// ISO 4217 currency codes accepted by the payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    NGN,
    GHS,
    ZAR,
    KES,
    USD,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::NGN => "₦",
            Self::GHS => "GH₵",
            Self::ZAR => "R",
            Self::KES => "KSh",
            Self::USD => "$",
        }
    }

    /// Three-letter code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NGN => "NGN",
            Self::GHS => "GHS",
            Self::ZAR => "ZAR",
            Self::KES => "KES",
            Self::USD => "USD",
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NGN" => Ok(Self::NGN),
            "GHS" => Ok(Self::GHS),
            "ZAR" => Ok(Self::ZAR),
            "KES" => Ok(Self::KES),
            "USD" => Ok(Self::USD),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_display_rounds_to_cents() {
        let price = Price::new(dec("22.6976"), CurrencyCode::USD);
        assert_eq!(price.display(), "$22.70");
    }

    #[test]
    fn test_display_pads_whole_amounts() {
        let price = Price::new(dec("5"), CurrencyCode::NGN);
        assert_eq!(price.to_string(), "₦5.00");
    }

    #[test]
    fn test_round_cents_midpoint_goes_up() {
        assert_eq!(round_cents(dec("1.235")), dec("1.24"));
        assert_eq!(round_cents(dec("1.2376")), dec("1.24"));
        assert_eq!(round_cents(dec("1.234")), dec("1.23"));
    }

    #[test]
    fn test_minor_units_floor() {
        let price = Price::new(dec("22.6976"), CurrencyCode::NGN);
        assert_eq!(price.to_minor_units(), Some(2269));

        let exact = Price::new(dec("100.00"), CurrencyCode::NGN);
        assert_eq!(exact.to_minor_units(), Some(10000));
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!(CurrencyCode::from_str("ngn").unwrap(), CurrencyCode::NGN);
        assert_eq!(CurrencyCode::from_str(" USD ").unwrap(), CurrencyCode::USD);
        assert!(CurrencyCode::from_str("XYZ").is_err());
    }
}
