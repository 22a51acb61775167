//! Cart pricing policy.
//!
//! The cart preview, the cart page, and the checkout page all display the
//! same four numbers: subtotal, tax, shipping, and total. They are derived
//! here and nowhere else. The backend computes its own authoritative totals
//! when an order is created; these are for display and for the amount handed
//! to the payment widget.
//!
//! # Rules
//!
//! - subtotal = Σ unit price × quantity, over lines whose product still exists
//! - tax = `tax_rate` × subtotal
//! - shipping = 0 when subtotal is strictly above `free_shipping_threshold`,
//!   otherwise `flat_shipping`
//! - total = subtotal + tax + shipping
//!
//! Each figure is rounded to cents for display. The total is summed from the
//! unrounded parts and rounded once.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::money::round_cents;
use crate::types::{CurrencyCode, Price};

/// A line that can be priced.
///
/// A line whose product was deleted server-side has no unit price; it is
/// skipped from every sum.
pub trait PricedLine {
    /// Unit price, or `None` when the product no longer exists.
    fn unit_price(&self) -> Option<Decimal>;

    /// Number of units on the line.
    fn quantity(&self) -> u32;
}

/// Tax and shipping constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Fraction of the subtotal charged as tax (0.08 = 8%).
    pub tax_rate: Decimal,
    /// Flat shipping fee charged at or below the threshold.
    pub flat_shipping: Decimal,
    /// Subtotal above which shipping is free.
    pub free_shipping_threshold: Decimal,
    /// Currency all amounts are expressed in.
    pub currency: CurrencyCode,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(8, 2),
            flat_shipping: Decimal::new(599, 2),
            free_shipping_threshold: Decimal::new(50, 0),
            currency: CurrencyCode::default(),
        }
    }
}

/// Display totals for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Price,
    pub tax: Price,
    pub shipping: Price,
    pub total: Price,
    /// Units across lines with a live product.
    pub item_count: u32,
}

impl CartTotals {
    /// Whether shipping was waived.
    #[must_use]
    pub fn free_shipping(&self) -> bool {
        self.shipping.is_zero()
    }
}

impl PricingPolicy {
    /// Shipping fee for a given subtotal.
    #[must_use]
    pub fn shipping_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal > self.free_shipping_threshold {
            Decimal::ZERO
        } else {
            self.flat_shipping
        }
    }

    /// Unrounded subtotal over lines with a live product.
    #[must_use]
    pub fn subtotal<L: PricedLine>(&self, lines: &[L]) -> Decimal {
        self.priced(lines).0
    }

    /// Sum the lines that can be priced, with their unit count.
    ///
    /// Lines without a live product are skipped, as are lines whose amount
    /// would overflow the running subtotal.
    fn priced<L: PricedLine>(&self, lines: &[L]) -> (Decimal, u32) {
        lines.iter().fold((Decimal::ZERO, 0), |(sum, units), line| {
            let next = line
                .unit_price()
                .and_then(|price| price.checked_mul(Decimal::from(line.quantity())))
                .and_then(|amount| sum.checked_add(amount));
            match next {
                Some(sum) => (sum, units.saturating_add(line.quantity())),
                None => (sum, units),
            }
        })
    }

    /// Compute display totals for a cart.
    #[must_use]
    pub fn totals<L: PricedLine>(&self, lines: &[L]) -> CartTotals {
        let (subtotal, item_count) = self.priced(lines);
        let tax = subtotal.saturating_mul(self.tax_rate);
        let shipping = self.shipping_for(subtotal);
        let total = subtotal.saturating_add(tax).saturating_add(shipping);

        CartTotals {
            subtotal: self.price(subtotal),
            tax: self.price(tax),
            shipping: self.price(shipping),
            total: self.price(total),
            item_count,
        }
    }

    /// Wrap an amount in this policy's currency, rounded to cents.
    #[must_use]
    pub fn price(&self, amount: Decimal) -> Price {
        Price::new(round_cents(amount), self.currency)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    struct Line(Option<&'static str>, u32);

    impl PricedLine for Line {
        fn unit_price(&self) -> Option<Decimal> {
            self.0.map(|p| Decimal::from_str(p).unwrap())
        }

        fn quantity(&self) -> u32 {
            self.1
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn usd() -> PricingPolicy {
        PricingPolicy {
            currency: CurrencyCode::USD,
            ..PricingPolicy::default()
        }
    }

    #[test]
    fn test_tomatoes_and_spinach() {
        let lines = [Line(Some("5.99"), 2), Line(Some("3.49"), 1)];
        let totals = usd().totals(&lines);

        assert_eq!(totals.subtotal.amount, dec("15.47"));
        assert_eq!(totals.tax.amount, dec("1.24"));
        assert_eq!(totals.shipping.amount, dec("5.99"));
        assert_eq!(totals.total.amount, dec("22.70"));
        assert_eq!(totals.total.display(), "$22.70");
        assert_eq!(totals.item_count, 3);
    }

    #[test]
    fn test_deleted_products_skipped() {
        let lines = [Line(Some("5.99"), 2), Line(None, 4), Line(Some("3.49"), 1)];
        let totals = usd().totals(&lines);

        assert_eq!(totals.subtotal.amount, dec("15.47"));
        assert_eq!(totals.item_count, 3);
    }

    #[test]
    fn test_only_deleted_products() {
        let lines = [Line(None, 1)];
        let policy = usd();
        assert_eq!(policy.subtotal(&lines), Decimal::ZERO);
        assert_eq!(policy.totals(&lines).item_count, 0);
    }

    #[test]
    fn test_overflowing_line_is_skipped() {
        let lines = [Line(Some("5.99"), 2), Line(Some("10000000000000000000000000000"), 10)];
        let totals = usd().totals(&lines);

        assert_eq!(totals.subtotal.amount, dec("11.98"));
        assert_eq!(totals.item_count, 2);
    }

    #[test]
    fn test_huge_subtotal_does_not_panic() {
        let lines = [Line(Some("79000000000000000000000000000"), 1)];
        let totals = usd().totals(&lines);

        assert_eq!(totals.item_count, 1);
        assert_eq!(totals.total.amount, Decimal::MAX);
    }

    #[test]
    fn test_shipping_boundary() {
        let policy = usd();
        assert_eq!(policy.shipping_for(dec("49.99")), dec("5.99"));
        assert_eq!(policy.shipping_for(dec("50")), dec("5.99"));
        assert_eq!(policy.shipping_for(dec("50.00")), dec("5.99"));
        assert_eq!(policy.shipping_for(dec("50.01")), Decimal::ZERO);
    }

    #[test]
    fn test_free_shipping_total() {
        let lines = [Line(Some("25.00"), 3)];
        let totals = usd().totals(&lines);

        assert!(totals.free_shipping());
        assert_eq!(totals.subtotal.amount, dec("75.00"));
        assert_eq!(totals.tax.amount, dec("6.00"));
        assert_eq!(totals.total.amount, dec("81.00"));
    }

    #[test]
    fn test_total_summed_before_rounding() {
        // tax 0.0796 rounds to 0.08 on its own; total is summed unrounded
        let lines = [Line(Some("0.995"), 1)];
        let totals = usd().totals(&lines);

        assert_eq!(totals.subtotal.amount, dec("1.00"));
        assert_eq!(totals.tax.amount, dec("0.08"));
        // 0.995 + 0.0796 + 5.99 = 7.0646
        assert_eq!(totals.total.amount, dec("7.06"));
    }

    #[test]
    fn test_custom_policy() {
        let policy = PricingPolicy {
            tax_rate: dec("0.075"),
            flat_shipping: dec("1500"),
            free_shipping_threshold: dec("20000"),
            currency: CurrencyCode::NGN,
        };
        let lines = [Line(Some("2500"), 2)];
        let totals = policy.totals(&lines);

        assert_eq!(totals.tax.amount, dec("375.00"));
        assert_eq!(totals.shipping.amount, dec("1500"));
        assert_eq!(totals.total.display(), "₦6875.00");
    }
}
