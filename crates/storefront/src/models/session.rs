//! Session-related types.
//!
//! Types stored in the session for authentication state.

use agromat_core::{UserId, UserRole};
use serde::{Deserialize, Serialize};

use crate::backend::UserAuth;

/// Session-stored user identity.
///
/// Written on login, removed on logout. The bearer token inside `auth` is
/// redacted from `Debug` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User id and bearer token for backend calls.
    pub auth: UserAuth,
    /// Display name.
    pub name: String,
    /// Email address as returned by the backend.
    pub email: String,
    /// Account type.
    pub role: UserRole,
}

impl CurrentUser {
    #[must_use]
    pub const fn id(&self) -> &UserId {
        &self.auth.user_id
    }

    /// First word of the display name, for the navigation bar.
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the last successfully fetched cart.
    pub const CART_SNAPSHOT: &str = "cart_snapshot";

    /// Key for the checkout awaiting a payment callback.
    pub const PENDING_CHECKOUT: &str = "pending_checkout";

    /// Key for the notice shown on the next rendered page.
    pub const NOTICE: &str = "notice";
}
