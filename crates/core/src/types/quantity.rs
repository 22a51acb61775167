//! Cart line quantity.
//!
//! A cart line always holds at least one unit. Going below one is not a
//! quantity update, it is a removal, and is rejected here so that no zero or
//! negative quantity is ever sent to the backend.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// Zero units requested.
    #[error("quantity must be at least 1")]
    Zero,
    /// A negative count was requested.
    #[error("quantity cannot be negative (got {0})")]
    Negative(i64),
    /// More units than a single line may carry.
    #[error("quantity must be at most {max}")]
    TooLarge {
        /// Maximum allowed quantity.
        max: u32,
    },
}

/// A positive number of units on a cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// Largest quantity a single line may carry.
    pub const MAX: u32 = 999;

    /// One unit.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Build a quantity from an unsigned count.
    ///
    /// # Errors
    ///
    /// Returns an error if `n` is zero or above [`Quantity::MAX`].
    pub fn new(n: u32) -> Result<Self, QuantityError> {
        if n > Self::MAX {
            return Err(QuantityError::TooLarge { max: Self::MAX });
        }
        NonZeroU32::new(n).map(Self).ok_or(QuantityError::Zero)
    }

    /// Build a quantity from a requested count that may be signed, e.g. the
    /// result of a `-` button press on a line that holds one unit.
    ///
    /// # Errors
    ///
    /// Returns an error if `n` is below one or above [`Quantity::MAX`].
    pub fn from_requested(n: i64) -> Result<Self, QuantityError> {
        if n < 0 {
            return Err(QuantityError::Negative(n));
        }
        let n = u32::try_from(n).map_err(|_| QuantityError::TooLarge { max: Self::MAX })?;
        Self::new(n)
    }

    /// The count as a plain integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        Self::new(n)
    }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self {
        q.get()
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
