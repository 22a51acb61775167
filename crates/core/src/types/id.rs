//! Newtype IDs for type-safe entity references.
//!
//! The marketplace backend keys every document by an opaque string (a
//! 24-character hex object id in practice). Use the `define_id!` macro to
//! create wrappers that prevent mixing ids of different entity types.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`
/// - `Display`, `From<String>`, `From<&str>` implementations
///
/// # Example
///
/// ```rust
/// # use agromat_core::define_id;
/// define_id!(FarmId);
/// define_id!(HarvestId);
///
/// let farm = FarmId::new("64b7f0c2a1");
/// assert_eq!(farm.as_str(), "64b7f0c2a1");
///
/// // These are different types, so this won't compile:
/// // let _: HarvestId = farm;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the underlying id string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(UserId);
define_id!(ProductId);
define_id!(OrderId);

impl OrderId {
    /// Short, human-facing order number (`ORD-` + last six id characters, uppercased).
    #[must_use]
    pub fn display_number(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        let start = chars.len().saturating_sub(6);
        let tail: String = chars.get(start..).unwrap_or_default().iter().collect();
        format!("ORD-{}", tail.to_uppercase())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_transparently() {
        let id = ProductId::new("650a1b2c3d4e5f6a7b8c9d0e");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"650a1b2c3d4e5f6a7b8c9d0e\"");

        let back: ProductId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_display_number_uses_last_six_chars() {
        let id = OrderId::new("650a1b2c3d4e5f6a7b8c9d0e");
        assert_eq!(id.display_number(), "ORD-8C9D0E");
    }

    #[test]
    fn test_display_number_short_id() {
        let id = OrderId::new("ab1");
        assert_eq!(id.display_number(), "ORD-AB1");
    }
}
