use thiserror::Error;

/// Errors that can occur when persisting or loading orders.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The caller tried to persist an order with no line items.
    #[error("Order must contain at least one item")]
    EmptyOrder,

    /// Another order already claimed this idempotency key.
    #[error("Idempotency key already used: {0}")]
    IdempotencyConflict(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row contained data the domain refuses to accept.
    #[error("Invalid stored order data: {0}")]
    InvalidRow(String),

    /// The backing store could not be reached.
    #[error("Order store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
