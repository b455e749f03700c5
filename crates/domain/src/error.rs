//! Domain validation errors.

use common::ProductId;
use thiserror::Error;

/// Errors raised when constructing domain values from untrusted input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The email address failed syntactic validation.
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// A money string could not be parsed as a decimal amount.
    #[error("Invalid money amount: {0}")]
    InvalidAmount(String),

    /// An order was constructed with no line items.
    #[error("Order must contain at least one item")]
    EmptyOrder,

    /// A line item had a zero quantity.
    #[error("Quantity must be greater than 0 for product {0}")]
    InvalidQuantity(ProductId),

    /// A stored status string did not match any known status.
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),
}
