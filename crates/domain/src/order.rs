//! Orders and their line item snapshots.

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::email::EmailAddress;
use crate::error::DomainError;
use crate::money::Money;
use crate::status::OrderStatus;

/// A line item captured at order time.
///
/// `product_name` and `unit_price` are snapshots of the catalog at the
/// moment stock was validated. Later catalog edits never touch them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// The catalog product this line refers to.
    pub product_id: ProductId,

    /// Product name as the catalog reported it at validation time.
    pub product_name: String,

    /// Quantity ordered.
    pub quantity: u32,

    /// Price per unit at validation time.
    pub unit_price: Money,
}

impl OrderItem {
    /// Creates a new order item.
    pub fn new(
        product_id: impl Into<ProductId>,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns the total price for this line (quantity * unit_price).
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A fully specified order ready to be persisted.
///
/// The total is computed once from the item snapshots at construction;
/// the store persists it verbatim and never recomputes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_email: EmailAddress,
    pub items: Vec<OrderItem>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub idempotency_key: Option<String>,
}

impl NewOrder {
    /// Builds a confirmed order from validated item snapshots.
    ///
    /// Fails if the item list is empty or any quantity is zero.
    pub fn confirmed(customer_email: EmailAddress, items: Vec<OrderItem>) -> Result<Self, DomainError> {
        if items.is_empty() {
            return Err(DomainError::EmptyOrder);
        }
        if let Some(item) = items.iter().find(|item| item.quantity == 0) {
            return Err(DomainError::InvalidQuantity(item.product_id));
        }
        let total_amount = items.iter().map(OrderItem::subtotal).sum();
        Ok(Self {
            customer_email,
            items,
            total_amount,
            status: OrderStatus::Confirmed,
            idempotency_key: None,
        })
    }

    /// Attaches a caller-supplied idempotency key.
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// A persisted order as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Store-assigned identifier.
    pub id: OrderId,

    /// Where the confirmation goes.
    pub customer_email: EmailAddress,

    /// Line items in the order the caller submitted them.
    pub items: Vec<OrderItem>,

    /// Total as computed at placement time.
    pub total_amount: Money,

    /// Lifecycle status.
    pub status: OrderStatus,

    /// Caller-supplied deduplication key, if any.
    pub idempotency_key: Option<String>,

    /// When the order was persisted.
    pub created_at: DateTime<Utc>,

    /// When the order was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns the human-facing order number ("#" followed by the ID).
    pub fn order_number(&self) -> String {
        format!("#{}", self.id)
    }

    /// Returns the number of distinct line items.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Recomputes the total from the item snapshots.
    ///
    /// Useful for consistency checks; the persisted `total_amount`
    /// remains authoritative.
    pub fn computed_total(&self) -> Money {
        self.items.iter().map(OrderItem::subtotal).sum()
    }
}
