//! Cart synchronization.
//!
//! The backend owns the cart. Every mutation is followed by a full re-fetch,
//! and the page renders whatever that re-fetch returned. When a call fails the
//! caller's last snapshot is kept and marked stale; nothing is retried.

use agromat_core::{CartTotals, PricingPolicy, ProductId, Quantity, QuantityError};
use tracing::{instrument, warn};

use crate::backend::{BackendError, CartApi, UserAuth};
use crate::models::{CartSnapshot, Notice};

/// What the cart views render.
#[derive(Debug, Clone)]
pub struct CartState {
    pub snapshot: CartSnapshot,
    pub totals: CartTotals,
    /// True when `snapshot` is the previous state because a call failed.
    pub stale: bool,
    pub notice: Option<Notice>,
}

impl CartState {
    /// Whether the snapshot should be written back to the session.
    #[must_use]
    pub const fn is_fresh(&self) -> bool {
        !self.stale
    }
}

/// Cart operations on behalf of one user.
pub struct CartSync<'a, A> {
    api: &'a A,
    pricing: &'a PricingPolicy,
}

impl<'a, A: CartApi> CartSync<'a, A> {
    #[must_use]
    pub const fn new(api: &'a A, pricing: &'a PricingPolicy) -> Self {
        Self { api, pricing }
    }

    /// Totals for a snapshot without touching the backend.
    #[must_use]
    pub fn render(&self, snapshot: CartSnapshot, notice: Option<Notice>) -> CartState {
        CartState {
            totals: self.pricing.totals(&snapshot.lines),
            snapshot,
            stale: false,
            notice,
        }
    }

    /// Fetch the cart.
    #[instrument(skip_all, fields(user_id = %auth.user_id))]
    pub async fn load(&self, auth: &UserAuth, previous: CartSnapshot) -> CartState {
        self.refetch(auth, previous, None).await
    }

    /// Add `quantity` units of a product, then re-fetch.
    #[instrument(skip_all, fields(user_id = %auth.user_id, product_id = %product_id, quantity = %quantity))]
    pub async fn add(
        &self,
        auth: &UserAuth,
        previous: CartSnapshot,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> CartState {
        let result = self.api.add_to_cart(auth, product_id, quantity).await;
        self.after_mutation(
            auth,
            previous,
            result,
            Notice::success("Added to cart"),
            "We couldn't add that item to your cart.",
        )
        .await
    }

    /// Set a line's quantity, then re-fetch.
    ///
    /// A requested quantity below 1 never reaches the backend; the line is
    /// left as it was and the user is pointed at the remove action.
    #[instrument(skip_all, fields(user_id = %auth.user_id, product_id = %product_id, requested = requested))]
    pub async fn set_quantity(
        &self,
        auth: &UserAuth,
        previous: CartSnapshot,
        product_id: &ProductId,
        requested: i64,
    ) -> CartState {
        let quantity = match Quantity::from_requested(requested) {
            Ok(quantity) => quantity,
            Err(QuantityError::Zero | QuantityError::Negative(_)) => {
                return self.render(
                    previous,
                    Some(Notice::info(
                        "Quantity can't go below 1. Use Remove to take the item out of your cart.",
                    )),
                );
            }
            Err(e @ QuantityError::TooLarge { .. }) => {
                return self.render(previous, Some(Notice::error(format!("Sorry, {e}."))));
            }
        };

        let result = self.api.update_cart_item(auth, product_id, quantity).await;
        self.after_mutation(
            auth,
            previous,
            result,
            Notice::success("Cart updated"),
            "We couldn't update that item.",
        )
        .await
    }

    /// Remove a line, then re-fetch.
    #[instrument(skip_all, fields(user_id = %auth.user_id, product_id = %product_id))]
    pub async fn remove(
        &self,
        auth: &UserAuth,
        previous: CartSnapshot,
        product_id: &ProductId,
    ) -> CartState {
        let result = self.api.remove_cart_item(auth, product_id).await;
        self.after_mutation(
            auth,
            previous,
            result,
            Notice::success("Item removed"),
            "We couldn't remove that item.",
        )
        .await
    }

    /// Empty the cart, then re-fetch.
    #[instrument(skip_all, fields(user_id = %auth.user_id))]
    pub async fn clear(&self, auth: &UserAuth, previous: CartSnapshot) -> CartState {
        let result = self.api.clear_cart(auth).await;
        self.after_mutation(
            auth,
            previous,
            result,
            Notice::success("Cart cleared"),
            "We couldn't clear your cart.",
        )
        .await
    }

    async fn after_mutation(
        &self,
        auth: &UserAuth,
        previous: CartSnapshot,
        result: Result<(), BackendError>,
        success: Notice,
        failure: &str,
    ) -> CartState {
        if let Err(e) = result {
            warn!(error = %e, "Cart mutation failed");
            let message = e
                .user_message()
                .map_or_else(|| failure.to_string(), str::to_string);
            return self.stale(previous, Notice::error(message));
        }
        self.refetch(auth, previous, Some(success)).await
    }

    async fn refetch(
        &self,
        auth: &UserAuth,
        previous: CartSnapshot,
        notice: Option<Notice>,
    ) -> CartState {
        match self.api.fetch_cart(auth).await {
            Ok(cart) => self.render(CartSnapshot::from(cart), notice),
            Err(e) => {
                warn!(error = %e, "Cart fetch failed, keeping last known cart");
                self.stale(
                    previous,
                    Notice::error("We couldn't refresh your cart. Showing the last known state."),
                )
            }
        }
    }

    fn stale(&self, previous: CartSnapshot, notice: Notice) -> CartState {
        CartState {
            stale: true,
            ..self.render(previous, Some(notice))
        }
    }
}
