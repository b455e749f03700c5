//! Error types for order placement.

use std::time::Duration;

use order_store::StoreError;
use thiserror::Error;

use crate::validate::LineFailure;

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum PlacementError {
    /// The request failed domain validation before any lookup or write.
    #[error("Invalid order request: {0}")]
    InvalidInput(String),

    /// One or more cart lines could not be fulfilled from catalog stock.
    #[error("Some items are out of stock")]
    InsufficientStock(Vec<LineFailure>),

    /// The placement deadline elapsed before the order was persisted.
    #[error("Order placement timed out after {0:?}")]
    Timeout(Duration),

    /// The order could not be written to storage.
    #[error("Failed to persist order: {0}")]
    Persistence(#[from] StoreError),
}

impl PlacementError {
    /// Per-line failure messages, in cart submission order.
    ///
    /// Empty for every variant except [`PlacementError::InsufficientStock`].
    pub fn details(&self) -> Vec<String> {
        match self {
            Self::InsufficientStock(failures) => {
                failures.iter().map(|f| f.to_string()).collect()
            }
            _ => Vec::new(),
        }
    }
}
