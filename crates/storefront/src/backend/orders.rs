//! Order endpoints.

use agromat_core::{OrderId, OrderStatus, UserId};
use tracing::{info, instrument};

use super::{
    BackendClient, BackendError, CreatedOrder, Envelope, Listing, NewOrder, Order, OrderApi,
    StatusUpdate, UserAuth, VerifyPayment, authorized,
};

impl OrderApi for BackendClient {
    #[instrument(skip(self, auth, order), fields(user_id = %auth.user_id, reference = %order.payment_reference))]
    async fn create_order(
        &self,
        auth: &UserAuth,
        order: &NewOrder,
    ) -> Result<CreatedOrder, BackendError> {
        let url = self.endpoint(&["orders", ""])?;
        let envelope: Envelope<CreatedOrder> = self
            .execute(authorized(self.post(url), auth).json(order))
            .await?;

        if envelope.success == Some(false) {
            return Err(BackendError::Rejected(envelope.message.unwrap_or_default()));
        }

        let created = envelope.data.unwrap_or(CreatedOrder { id: None });
        info!(order_id = ?created.id, "Order created");
        Ok(created)
    }
}

impl BackendClient {
    /// A buyer's orders (`GET /orders/user/:userId`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be parsed.
    #[instrument(skip(self, auth), fields(user_id = %auth.user_id))]
    pub async fn orders_for_user(&self, auth: &UserAuth) -> Result<Vec<Order>, BackendError> {
        let url = self.endpoint(&["orders", "user", auth.user_id.as_str()])?;
        let listing: Listing<Order> = self.execute(authorized(self.get(url), auth)).await?;
        Ok(listing.into_items())
    }

    /// Orders containing a seller's products (`GET /orders/seller/:sellerId`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be parsed.
    #[instrument(skip(self, auth), fields(seller_id = %seller_id))]
    pub async fn orders_for_seller(
        &self,
        auth: &UserAuth,
        seller_id: &UserId,
    ) -> Result<Vec<Order>, BackendError> {
        let url = self.endpoint(&["orders", "seller", seller_id.as_str()])?;
        let listing: Listing<Order> = self.execute(authorized(self.get(url), auth)).await?;
        Ok(listing.into_items())
    }

    /// Every order (`GET /orders/`). Admin only on the backend side.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be parsed.
    #[instrument(skip(self, auth))]
    pub async fn all_orders(&self, auth: &UserAuth) -> Result<Vec<Order>, BackendError> {
        let url = self.endpoint(&["orders", ""])?;
        let listing: Listing<Order> = self.execute(authorized(self.get(url), auth)).await?;
        Ok(listing.into_items())
    }

    /// `PUT /orders/:id/status`
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the change.
    #[instrument(skip(self, auth), fields(order_id = %id, status = %status))]
    pub async fn update_order_status(
        &self,
        auth: &UserAuth,
        id: &OrderId,
        status: &OrderStatus,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&["orders", id.as_str(), "status"])?;
        self.execute_mutation(authorized(self.put(url), auth).json(&StatusUpdate { status }))
            .await
            .map(drop)
    }

    /// `PUT /orders/:id/verify`
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot verify the payment.
    #[instrument(skip(self, auth), fields(order_id = %id))]
    pub async fn verify_order_payment(
        &self,
        auth: &UserAuth,
        id: &OrderId,
        reference: &str,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&["orders", id.as_str(), "verify"])?;
        self.execute_mutation(authorized(self.put(url), auth).json(&VerifyPayment { reference }))
            .await
            .map(drop)
    }
}
