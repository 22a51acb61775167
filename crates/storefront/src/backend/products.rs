//! Product catalog endpoints.

use agromat_core::{ProductId, UserId};
use tracing::{debug, instrument};

use super::cache::{CacheKey, CacheValue};
use super::{BackendClient, BackendError, Listing, MessageResponse, Product, ProductInput, UserAuth, authorized};

impl BackendClient {
    /// All product listings (`GET /products`). Cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be parsed.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Vec<Product>, BackendError> {
        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(&CacheKey::AllProducts).await
        {
            debug!("Cache hit for product listing");
            return Ok(products);
        }

        let url = self.endpoint(&["products"])?;
        let listing: Listing<Product> = self.execute(self.get(url)).await?;
        let products = listing.into_items();

        self.inner
            .cache
            .insert(CacheKey::AllProducts, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Listings owned by one seller (`GET /products?sellerId=`). Cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be parsed.
    #[instrument(skip(self), fields(seller_id = %seller_id))]
    pub async fn seller_products(&self, seller_id: &UserId) -> Result<Vec<Product>, BackendError> {
        let key = CacheKey::SellerProducts(seller_id.to_string());
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for seller listing");
            return Ok(products);
        }

        let mut url = self.endpoint(&["products"])?;
        url.query_pairs_mut().append_pair("sellerId", seller_id.as_str());
        let listing: Listing<Product> = self.execute(self.get(url)).await?;
        let products = listing.into_items();

        self.inner
            .cache
            .insert(key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Look up one listing in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no listing has this id.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<Product, BackendError> {
        self.products()
            .await?
            .into_iter()
            .find(|product| &product.id == id)
            .ok_or(BackendError::NotFound)
    }

    /// Create a listing (`POST /products`).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the listing.
    #[instrument(skip(self, auth, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        auth: &UserAuth,
        input: &ProductInput,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&["products"])?;
        let result = self
            .execute_mutation(authorized(self.post(url), auth).json(input))
            .await;
        self.invalidate_catalog();
        result.map(drop)
    }

    /// Replace a listing (`PUT /products/:id`).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, auth, input), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        auth: &UserAuth,
        id: &ProductId,
        input: &ProductInput,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&["products", id.as_str()])?;
        let result = self
            .execute_mutation(authorized(self.put(url), auth).json(input))
            .await;
        self.invalidate_catalog();
        result.map(drop)
    }

    /// Delete a listing (`DELETE /products/:id`).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the deletion.
    #[instrument(skip(self, auth), fields(product_id = %id))]
    pub async fn delete_product(&self, auth: &UserAuth, id: &ProductId) -> Result<(), BackendError> {
        let url = self.endpoint(&["products", id.as_str()])?;
        let result: Result<MessageResponse, _> =
            self.execute_mutation(authorized(self.delete(url), auth)).await;
        self.invalidate_catalog();
        result.map(drop)
    }

    /// Drop every cached listing.
    ///
    /// Called after any product mutation, successful or not, since a timed-out
    /// request may still have been applied.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }
}
