use async_trait::async_trait;
use common::OrderId;
use domain::{NewOrder, Order};

use crate::Result;

/// Core trait for order store implementations.
///
/// A store persists confirmed orders together with their line item
/// snapshots. All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order and its items atomically.
    ///
    /// Either the order and every line item are written, or nothing is.
    /// The store assigns the ID and timestamps; the caller's total and
    /// item snapshots are persisted verbatim, never recomputed.
    ///
    /// Fails with `EmptyOrder` when the order has no items and with
    /// `IdempotencyConflict` when another order already claimed the
    /// same idempotency key.
    async fn create(&self, new_order: NewOrder) -> Result<Order>;

    /// Loads an order together with its items.
    ///
    /// Items come back in the order the caller submitted them.
    /// Returns None if no order with this ID exists.
    async fn get(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Looks up the order that claimed an idempotency key, if any.
    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Order>>;
}
