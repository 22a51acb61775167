//! REST client for the AgroMat backend.
//!
//! # Architecture
//!
//! - The backend is the source of truth for products, carts, and orders
//! - Every call is a plain JSON request over `reqwest`; no local sync
//! - Product listings are cached in-process via `moka` (1 minute TTL) and
//!   invalidated on every product mutation
//! - Carts and orders are never cached
//!
//! Cart and order calls are also exposed through the [`CartApi`] and
//! [`OrderApi`] traits so the cart and checkout services can be exercised
//! against in-memory fakes.
//!
//! # Example
//!
//! ```rust,ignore
//! use agromat_storefront::backend::{BackendClient, CartApi};
//!
//! let client = BackendClient::new(&config.backend)?;
//! let products = client.products().await?;
//! let cart = client.fetch_cart(&user.auth).await?;
//! ```

mod auth;
mod cache;
mod cart;
mod orders;
mod products;
pub mod types;

use std::sync::Arc;

use agromat_core::{ProductId, Quantity};
use moka::future::Cache;
use reqwest::{RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::BackendConfig;

pub use types::*;

use cache::{CacheKey, CacheValue};

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message from the response body, or a truncated body.
        message: String,
    },

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("not found")]
    NotFound,

    /// Token missing, expired, or lacking permission.
    #[error("unauthorized")]
    Unauthorized,

    /// The backend answered 2xx but reported failure in the body.
    #[error("rejected: {0}")]
    Rejected(String),

    /// An endpoint URL could not be built.
    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

impl BackendError {
    /// A message safe to show to the user, if the backend provided one.
    #[must_use]
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Status { status, message } if *status < 500 && !message.is_empty() => {
                Some(message)
            }
            Self::Rejected(message) if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

// =============================================================================
// Service seams
// =============================================================================

/// Cart endpoints used by the cart and checkout services.
pub trait CartApi: Send + Sync {
    /// `GET /cart?userId=`
    fn fetch_cart(&self, auth: &UserAuth) -> impl Future<Output = Result<Cart, BackendError>> + Send;

    /// `POST /cart/add/:userId`
    fn add_to_cart(
        &self,
        auth: &UserAuth,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// `PUT /cart/update/:userId/:productId/:quantity`
    fn update_cart_item(
        &self,
        auth: &UserAuth,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// `DELETE /cart/:userId/:productId`
    fn remove_cart_item(
        &self,
        auth: &UserAuth,
        product_id: &ProductId,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// `DELETE /cart/clear/:userId`
    fn clear_cart(&self, auth: &UserAuth) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// `GET /cart/total/:userId`
    fn cart_total(
        &self,
        auth: &UserAuth,
    ) -> impl Future<Output = Result<Decimal, BackendError>> + Send;
}

/// Order endpoints used by the checkout service.
pub trait OrderApi: Send + Sync {
    /// `POST /orders/`
    fn create_order(
        &self,
        auth: &UserAuth,
        order: &NewOrder,
    ) -> impl Future<Output = Result<CreatedOrder, BackendError>> + Send;
}

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the AgroMat REST backend.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("agromat-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.base_url.clone(),
                cache: cache::build(),
            }),
        })
    }

    /// Build an endpoint URL from path segments relative to the base URL.
    ///
    /// Each segment is percent-encoded; an empty trailing segment yields a
    /// trailing slash.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let path = segments
            .iter()
            .map(|segment| urlencoding::encode(segment))
            .collect::<Vec<_>>()
            .join("/");
        Ok(self.inner.base_url.join(&path)?)
    }

    fn get(&self, url: Url) -> RequestBuilder {
        self.inner.client.get(url)
    }

    fn post(&self, url: Url) -> RequestBuilder {
        self.inner.client.post(url)
    }

    fn put(&self, url: Url) -> RequestBuilder {
        self.inner.client.put(url)
    }

    fn delete(&self, url: Url) -> RequestBuilder {
        self.inner.client.delete(url)
    }

    /// Send a request and decode the JSON body.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        // Some mutations answer 200/204 with no body
        let body = if text.trim().is_empty() { "{}" } else { text.as_str() };

        serde_json::from_str(body).map_err(|e| {
            tracing::error!(
                error = %e,
                status = %status,
                body = %truncate(&text, 500),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    /// Send a mutation and fail if the body reports `success: false`.
    async fn execute_mutation(&self, request: RequestBuilder) -> Result<MessageResponse, BackendError> {
        let response: MessageResponse = self.execute(request).await?;
        if response.success == Some(false) {
            return Err(BackendError::Rejected(
                response.message.unwrap_or_default(),
            ));
        }
        Ok(response)
    }
}

fn authorized(request: RequestBuilder, auth: &UserAuth) -> RequestBuilder {
    request.bearer_auth(auth.token.expose())
}

fn status_error(status: StatusCode, body: &str) -> BackendError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized,
        StatusCode::NOT_FOUND => BackendError::NotFound,
        _ => {
            let message = serde_json::from_str::<ErrorBody>(body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| truncate(body, 200));

            if status.is_server_error() {
                tracing::error!(status = %status, message = %message, "Backend returned server error");
            } else {
                tracing::warn!(status = %status, message = %message, "Backend rejected request");
            }

            BackendError::Status {
                status: status.as_u16(),
                message,
            }
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
