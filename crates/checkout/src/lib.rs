//! Order placement orchestration.
//!
//! Coordinates the three phases of placing an order:
//!
//! 1. **Validate** — look up every cart line in the product catalog and
//!    check stock, snapshotting name and price from the same response.
//! 2. **Persist** — write the order and its items atomically through an
//!    [`order_store::OrderStore`].
//! 3. **Notify** — send an order confirmation on a best-effort basis. A
//!    failed notification never un-places an order.
//!
//! [`OrderPlacement`] is the entry point; it is generic over the catalog
//! client, the store, and the notification service so tests can swap in
//! the in-memory implementations.

pub mod catalog;
pub mod config;
pub mod error;
pub mod notify;
pub mod placement;
pub mod validate;

pub use catalog::{CatalogClient, HttpCatalogClient, InMemoryCatalogClient, LookupError, Product};
pub use config::CheckoutConfig;
pub use error::PlacementError;
pub use notify::{
    DispatchRecord, DispatchStatus, HttpNotificationService, InMemoryNotificationService,
    NotificationDispatcher, NotificationError, NotificationService,
};
pub use placement::{OrderPlacement, PlaceOrder, PlacedOrder, PlacementPolicy};
pub use validate::{CartLine, LineFailure, StockValidator};
