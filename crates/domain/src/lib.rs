//! Order domain model for the storefront checkout flow.
//!
//! This crate provides the core value objects shared by the checkout
//! orchestration and the order store:
//! - Money amounts backed by integer cents
//! - Validated customer email addresses
//! - The order status lifecycle
//! - Orders and their point-in-time line item snapshots

pub mod email;
pub mod error;
pub mod money;
pub mod order;
pub mod status;

pub use email::EmailAddress;
pub use error::DomainError;
pub use money::Money;
pub use order::{NewOrder, Order, OrderItem};
pub use status::OrderStatus;
