//! Order persistence for the storefront checkout flow.
//!
//! The [`OrderStore`] trait persists confirmed orders atomically with
//! their line item snapshots. Two implementations are provided:
//! - [`PostgresOrderStore`] for production
//! - [`InMemoryOrderStore`] for tests, with fault injection switches

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::OrderId;
pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use store::OrderStore;
