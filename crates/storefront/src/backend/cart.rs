//! Cart endpoints.
//!
//! Every call is keyed by user id in the path or query and carries the bearer
//! token. Nothing here is cached.

use agromat_core::{ProductId, Quantity};
use rust_decimal::Decimal;
use tracing::instrument;

use super::{
    AddToCartRequest, BackendClient, BackendError, Cart, CartApi, CartTotalResponse,
    MessageResponse, UserAuth, authorized,
};

impl CartApi for BackendClient {
    #[instrument(skip(self, auth), fields(user_id = %auth.user_id))]
    async fn fetch_cart(&self, auth: &UserAuth) -> Result<Cart, BackendError> {
        let mut url = self.endpoint(&["cart"])?;
        url.query_pairs_mut()
            .append_pair("userId", auth.user_id.as_str());
        self.execute(authorized(self.get(url), auth)).await
    }

    #[instrument(skip(self, auth), fields(user_id = %auth.user_id, product_id = %product_id))]
    async fn add_to_cart(
        &self,
        auth: &UserAuth,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&["cart", "add", auth.user_id.as_str()])?;
        let body = AddToCartRequest {
            user_id: &auth.user_id,
            product_id,
            quantity: quantity.get(),
        };
        let _: MessageResponse = self
            .execute_mutation(authorized(self.post(url), auth).json(&body))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, auth), fields(user_id = %auth.user_id, product_id = %product_id))]
    async fn update_cart_item(
        &self,
        auth: &UserAuth,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<(), BackendError> {
        let quantity = quantity.to_string();
        let url = self.endpoint(&[
            "cart",
            "update",
            auth.user_id.as_str(),
            product_id.as_str(),
            &quantity,
        ])?;
        self.execute_mutation(authorized(self.put(url), auth))
            .await
            .map(drop)
    }

    #[instrument(skip(self, auth), fields(user_id = %auth.user_id, product_id = %product_id))]
    async fn remove_cart_item(
        &self,
        auth: &UserAuth,
        product_id: &ProductId,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&["cart", auth.user_id.as_str(), product_id.as_str()])?;
        self.execute_mutation(authorized(self.delete(url), auth))
            .await
            .map(drop)
    }

    #[instrument(skip(self, auth), fields(user_id = %auth.user_id))]
    async fn clear_cart(&self, auth: &UserAuth) -> Result<(), BackendError> {
        let url = self.endpoint(&["cart", "clear", auth.user_id.as_str()])?;
        self.execute_mutation(authorized(self.delete(url), auth))
            .await
            .map(drop)
    }

    #[instrument(skip(self, auth), fields(user_id = %auth.user_id))]
    async fn cart_total(&self, auth: &UserAuth) -> Result<Decimal, BackendError> {
        let url = self.endpoint(&["cart", "total", auth.user_id.as_str()])?;
        let response: CartTotalResponse = self.execute(authorized(self.get(url), auth)).await?;
        Ok(response.total)
    }
}
