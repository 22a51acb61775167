//! Status enums for orders, payments, products, and users.
//!
//! The backend stores these as free-form lowercase strings. Known values map
//! to named variants; anything else is kept verbatim in `Other` so that a new
//! server-side status never breaks deserialization of an order list.

use serde::{Deserialize, Serialize};

/// Define a string-backed status enum with an `Other(String)` fallback.
macro_rules! string_status {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// A value this storefront does not know about.
            Other(String),
        }

        impl $name {
            /// The wire representation.
            #[must_use]
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $wire, )+
                    Self::Other(s) => s,
                }
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                match s.trim().to_ascii_lowercase().as_str() {
                    $( $wire => Self::$variant, )+
                    _ => Self::Other(s),
                }
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::from(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(status: $name) -> Self {
                status.as_str().to_owned()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_status! {
    /// Delivery status of an order.
    OrderStatus {
        Pending => "pending",
        Processing => "processing",
        Shipped => "shipped",
        Delivered => "delivered",
        Cancelled => "cancelled",
    }
}

string_status! {
    /// Payment status of an order.
    PaymentStatus {
        Pending => "pending",
        Success => "success",
        Failed => "failed",
    }
}

string_status! {
    /// Listing status of a product.
    ProductStatus {
        InStock => "in-stock",
        OutOfStock => "out-of-stock",
        PendingApproval => "pending",
    }
}

string_status! {
    /// Account type of a marketplace user.
    UserRole {
        Buyer => "buyer",
        Seller => "seller",
        Admin => "admin",
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Buyer
    }
}

impl OrderStatus {
    /// Statuses a seller or admin may move an order to.
    pub const SETTABLE: [Self; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Whether the order still awaits fulfilment.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }
}

impl UserRole {
    /// Sellers and admins may open the seller dashboard.
    #[must_use]
    pub const fn can_sell(&self) -> bool {
        matches!(self, Self::Seller | Self::Admin)
    }

    /// Only admins may open the admin console.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}
