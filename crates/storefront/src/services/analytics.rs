//! Admin order analytics.

use agromat_core::{OrderStatus, PaymentStatus};
use rust_decimal::Decimal;

use crate::backend::Order;

/// Order count for one status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: usize,
}

/// Marketplace-wide order figures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAnalytics {
    pub order_count: usize,
    /// Sum of `totalAmount` over orders whose payment succeeded.
    pub revenue: Decimal,
    pub paid_orders: usize,
    pub unpaid_orders: usize,
    /// Every known status in fulfilment order, then any unknown ones.
    pub by_status: Vec<StatusCount>,
}

impl OrderAnalytics {
    #[must_use]
    pub fn compute(orders: &[Order]) -> Self {
        let paid: Vec<&Order> = orders
            .iter()
            .filter(|o| o.payment_status == PaymentStatus::Success)
            .collect();

        let mut by_status: Vec<StatusCount> = OrderStatus::SETTABLE
            .iter()
            .map(|status| StatusCount {
                status: status.clone(),
                count: 0,
            })
            .collect();

        for order in orders {
            match by_status.iter_mut().find(|s| s.status == order.status) {
                Some(entry) => entry.count += 1,
                None => by_status.push(StatusCount {
                    status: order.status.clone(),
                    count: 1,
                }),
            }
        }

        Self {
            order_count: orders.len(),
            revenue: paid.iter().map(|o| o.total_amount).sum(),
            paid_orders: paid.len(),
            unpaid_orders: orders.len() - paid.len(),
            by_status,
        }
    }

    /// Count for one status.
    #[must_use]
    pub fn count(&self, status: &OrderStatus) -> usize {
        self.by_status
            .iter()
            .find(|s| &s.status == status)
            .map_or(0, |s| s.count)
    }
}
