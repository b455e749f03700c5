//! Order placement orchestrator.

use std::time::Duration;

use common::OrderId;
use domain::{EmailAddress, NewOrder, Order};
use order_store::{OrderStore, StoreError};

use crate::catalog::CatalogClient;
use crate::config::CheckoutConfig;
use crate::error::PlacementError;
use crate::notify::{
    DEFAULT_DISPATCH_TIMEOUT, DispatchRecord, NotificationDispatcher, NotificationService,
};
use crate::validate::{CartLine, StockValidator};

/// Limits applied to every placement.
#[derive(Debug, Clone)]
pub struct PlacementPolicy {
    /// Hard deadline for validation and persistence combined.
    pub deadline: Duration,
    /// Extra catalog attempts per line when the catalog is unavailable.
    pub lookup_retries: u32,
    /// Per-dispatch timeout for the confirmation notification.
    pub notification_timeout: Duration,
}

impl Default for PlacementPolicy {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(30),
            lookup_retries: 1,
            notification_timeout: DEFAULT_DISPATCH_TIMEOUT,
        }
    }
}

impl From<&CheckoutConfig> for PlacementPolicy {
    fn from(config: &CheckoutConfig) -> Self {
        Self {
            deadline: config.placement_deadline,
            lookup_retries: config.lookup_retries,
            notification_timeout: config.notification_timeout,
        }
    }
}

/// A customer's request to place an order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub email: String,
    pub lines: Vec<CartLine>,
    pub idempotency_key: Option<String>,
}

impl PlaceOrder {
    /// Creates a placement request without an idempotency key.
    pub fn new(email: impl Into<String>, lines: Vec<CartLine>) -> Self {
        Self {
            email: email.into(),
            lines,
            idempotency_key: None,
        }
    }

    /// Attaches an idempotency key; resubmissions with the same key replay
    /// the first order instead of creating another.
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// A successfully placed (or replayed) order.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    /// True when an earlier order with the same idempotency key was
    /// returned instead of creating a new one.
    pub replayed: bool,
}

/// Orchestrates the full placement flow.
///
/// Drives three phases: stock validation against the catalog, atomic
/// persistence through the store, and best-effort confirmation dispatch.
/// The first two run under the placement deadline; notification happens
/// after commit and can neither delay nor fail the placement.
pub struct OrderPlacement<S, C, N>
where
    S: OrderStore,
    C: CatalogClient,
    N: NotificationService,
{
    store: S,
    validator: StockValidator<C>,
    dispatcher: NotificationDispatcher<N>,
    deadline: Duration,
}

impl<S, C, N> OrderPlacement<S, C, N>
where
    S: OrderStore,
    C: CatalogClient,
    N: NotificationService,
{
    /// Creates a new placement orchestrator.
    pub fn new(store: S, catalog: C, notifier: N, policy: PlacementPolicy) -> Self {
        Self {
            store,
            validator: StockValidator::new(catalog).with_lookup_retries(policy.lookup_retries),
            dispatcher: NotificationDispatcher::with_timeout(notifier, policy.notification_timeout),
            deadline: policy.deadline,
        }
    }

    /// Places an order.
    ///
    /// Request-shape problems are rejected before any catalog or store
    /// call. Stock failures report every failing line at once. The
    /// returned order carries the catalog snapshots taken during this
    /// call (or the original ones, when an idempotency key replays).
    #[tracing::instrument(skip(self, request), fields(lines = request.lines.len()))]
    pub async fn place_order(&self, request: PlaceOrder) -> Result<PlacedOrder, PlacementError> {
        let start = std::time::Instant::now();

        // 1. Validate the request shape before touching any collaborator
        let email = EmailAddress::parse(&request.email)
            .map_err(|e| PlacementError::InvalidInput(e.to_string()))?;
        if request.lines.is_empty() {
            return Err(PlacementError::InvalidInput(
                "Order must contain at least one item".to_string(),
            ));
        }
        if let Some(line) = request.lines.iter().find(|l| l.quantity == 0) {
            return Err(PlacementError::InvalidInput(format!(
                "Quantity must be greater than 0 for product {}",
                line.product_id
            )));
        }

        // 2. Replay any order already placed under this idempotency key
        if let Some(key) = &request.idempotency_key
            && let Some(existing) = self.store.find_by_idempotency_key(key).await?
        {
            tracing::info!(order_id = %existing.id, "replaying order for idempotency key");
            return Ok(PlacedOrder {
                order: existing,
                replayed: true,
            });
        }

        // 3. Validate stock and persist, bounded by the placement deadline
        let placed = tokio::time::timeout(self.deadline, self.validate_and_persist(email, &request))
            .await
            .map_err(|_| PlacementError::Timeout(self.deadline))??;

        if placed.replayed {
            // a concurrent request claimed the key first; its confirmation
            // already went out
            return Ok(placed);
        }

        metrics::counter!("orders_placed_total").increment(1);
        metrics::histogram!("order_placement_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        tracing::info!(
            order_id = %placed.order.id,
            total = %placed.order.total_amount,
            "order placed"
        );

        // 4. Best-effort confirmation; the order is already committed
        self.dispatcher.dispatch(&placed.order).await;

        Ok(placed)
    }

    async fn validate_and_persist(
        &self,
        email: EmailAddress,
        request: &PlaceOrder,
    ) -> Result<PlacedOrder, PlacementError> {
        let items = match self.validator.validate(&request.lines).await {
            Ok(items) => items,
            Err(failures) => {
                metrics::counter!("orders_rejected_total").increment(1);
                tracing::info!(failures = failures.len(), "order rejected by stock validation");
                return Err(PlacementError::InsufficientStock(failures));
            }
        };

        let mut new_order = NewOrder::confirmed(email, items)
            .map_err(|e| PlacementError::InvalidInput(e.to_string()))?;
        new_order.idempotency_key = request.idempotency_key.clone();

        match self.store.create(new_order).await {
            Ok(order) => Ok(PlacedOrder {
                order,
                replayed: false,
            }),
            Err(StoreError::IdempotencyConflict(key)) => {
                let existing = self
                    .store
                    .find_by_idempotency_key(&key)
                    .await?
                    .ok_or(StoreError::IdempotencyConflict(key))?;
                Ok(PlacedOrder {
                    order: existing,
                    replayed: true,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Loads a previously placed order.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        self.store.get(order_id).await
    }

    /// All confirmation dispatch attempts made through this orchestrator.
    pub fn notification_records(&self) -> Vec<DispatchRecord> {
        self.dispatcher.records()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, RwLock};

    use async_trait::async_trait;
    use domain::{Money, OrderStatus};
    use order_store::InMemoryOrderStore;

    use super::*;
    use crate::catalog::{InMemoryCatalogClient, LookupError, Product};
    use crate::notify::{DispatchStatus, InMemoryNotificationService};

    fn setup() -> (
        OrderPlacement<InMemoryOrderStore, InMemoryCatalogClient, InMemoryNotificationService>,
        InMemoryOrderStore,
        InMemoryCatalogClient,
        InMemoryNotificationService,
    ) {
        let store = InMemoryOrderStore::new();
        let catalog = InMemoryCatalogClient::new();
        catalog.insert(Product::new(
            1u64,
            "Mechanical Keyboard",
            Money::from_cents(7999),
            50,
        ));
        catalog.insert(Product::new(2u64, "USB Cable", Money::from_cents(500), 10));
        let notifier = InMemoryNotificationService::new();

        let placement = OrderPlacement::new(
            store.clone(),
            catalog.clone(),
            notifier.clone(),
            PlacementPolicy::default(),
        );

        (placement, store, catalog, notifier)
    }

    fn request(lines: Vec<CartLine>) -> PlaceOrder {
        PlaceOrder::new("buyer@example.com", lines)
    }

    #[tokio::test]
    async fn test_place_order_happy_path() {
        let (placement, store, _, notifier) = setup();

        let placed = placement
            .place_order(request(vec![CartLine::new(1u64, 2), CartLine::new(2u64, 1)]))
            .await
            .unwrap();

        assert!(!placed.replayed);
        assert_eq!(placed.order.status, OrderStatus::Confirmed);
        assert_eq!(placed.order.total_amount, Money::from_cents(16498));
        assert_eq!(placed.order.items.len(), 2);
        assert_eq!(placed.order.items[0].product_name, "Mechanical Keyboard");
        assert_eq!(store.order_count().await, 1);
        assert_eq!(notifier.sent_orders(), vec![placed.order.id]);

        let records = placement.notification_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, DispatchStatus::Sent);

        let fetched = placement.get_order(placed.order.id).await.unwrap().unwrap();
        assert_eq!(fetched, placed.order);
    }

    #[tokio::test]
    async fn test_insufficient_stock_reports_exact_message() {
        let (placement, store, _, notifier) = setup();

        let err = placement
            .place_order(request(vec![CartLine::new(1u64, 1000)]))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Some items are out of stock");
        assert_eq!(
            err.details(),
            vec!["Insufficient stock for Mechanical Keyboard. Available: 50, Requested: 1000"]
        );
        assert_eq!(store.order_count().await, 0);
        assert_eq!(notifier.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_product_reports_not_found_message() {
        let (placement, _, _, _) = setup();

        let err = placement
            .place_order(request(vec![CartLine::new(9999u64, 1)]))
            .await
            .unwrap_err();

        assert_eq!(err.details(), vec!["Product with ID 9999 not found"]);
    }

    #[tokio::test]
    async fn test_all_failures_reported_in_submission_order() {
        let (placement, _, _, _) = setup();

        let err = placement
            .place_order(request(vec![
                CartLine::new(1u64, 1000),
                CartLine::new(2u64, 1),
                CartLine::new(9999u64, 1),
            ]))
            .await
            .unwrap_err();

        assert_eq!(
            err.details(),
            vec![
                "Insufficient stock for Mechanical Keyboard. Available: 50, Requested: 1000",
                "Product with ID 9999 not found",
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_email_rejected_before_any_lookup() {
        let (placement, _, catalog, _) = setup();

        let err = placement
            .place_order(PlaceOrder::new(
                "not-an-email",
                vec![CartLine::new(1u64, 1)],
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, PlacementError::InvalidInput(_)));
        assert_eq!(catalog.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_cart_rejected_before_any_lookup() {
        let (placement, _, catalog, _) = setup();

        let err = placement.place_order(request(vec![])).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "Invalid order request: Order must contain at least one item"
        );
        assert_eq!(catalog.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected_before_any_lookup() {
        let (placement, _, catalog, _) = setup();

        let err = placement
            .place_order(request(vec![CartLine::new(1u64, 2), CartLine::new(2u64, 0)]))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Invalid order request: Quantity must be greater than 0 for product 2"
        );
        assert_eq!(catalog.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_notification_failure_leaves_order_placed() {
        let (placement, store, _, notifier) = setup();
        notifier.set_fail_on_send(true);

        let placed = placement
            .place_order(request(vec![CartLine::new(1u64, 1)]))
            .await
            .unwrap();

        assert_eq!(placed.order.status, OrderStatus::Confirmed);
        assert_eq!(store.order_count().await, 1);

        let records = placement.notification_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, DispatchStatus::Failed);
        assert!(records[0].error.is_some());
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_persistence_error() {
        let (placement, store, _, notifier) = setup();
        store.set_fail_on_create(true).await;

        let err = placement
            .place_order(request(vec![CartLine::new(1u64, 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, PlacementError::Persistence(_)));
        assert_eq!(notifier.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_catalog_outage_exhausts_retries_then_rejects() {
        let (placement, _, catalog, _) = setup();
        catalog.set_unavailable(true);

        let err = placement
            .place_order(request(vec![CartLine::new(1u64, 1)]))
            .await
            .unwrap_err();

        assert_eq!(err.details(), vec!["Product with ID 1 not found"]);
        assert_eq!(catalog.lookup_count(), 2);
    }

    /// Catalog that fails a fixed number of lookups before recovering.
    #[derive(Clone)]
    struct FlakyCatalog {
        inner: InMemoryCatalogClient,
        failures_left: Arc<RwLock<u32>>,
    }

    #[async_trait]
    impl CatalogClient for FlakyCatalog {
        async fn lookup(&self, product_id: common::ProductId) -> Result<Product, LookupError> {
            {
                let mut left = self.failures_left.write().unwrap();
                if *left > 0 {
                    *left -= 1;
                    return Err(LookupError::Unavailable("transient".to_string()));
                }
            }
            self.inner.lookup(product_id).await
        }
    }

    #[tokio::test]
    async fn test_flaky_catalog_recovers_on_retry() {
        let inner = InMemoryCatalogClient::new();
        inner.insert(Product::new(1u64, "Widget", Money::from_cents(500), 5));
        let catalog = FlakyCatalog {
            inner,
            failures_left: Arc::new(RwLock::new(1)),
        };

        let placement = OrderPlacement::new(
            InMemoryOrderStore::new(),
            catalog,
            InMemoryNotificationService::new(),
            PlacementPolicy::default(),
        );

        let placed = placement
            .place_order(request(vec![CartLine::new(1u64, 2)]))
            .await
            .unwrap();

        assert_eq!(placed.order.total_amount, Money::from_cents(1000));
    }

    #[tokio::test]
    async fn test_idempotency_key_replays_first_order() {
        let (placement, store, _, notifier) = setup();

        let first = placement
            .place_order(
                request(vec![CartLine::new(1u64, 1)]).with_idempotency_key("checkout-42"),
            )
            .await
            .unwrap();
        let second = placement
            .place_order(
                request(vec![CartLine::new(1u64, 1)]).with_idempotency_key("checkout-42"),
            )
            .await
            .unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(second.order.id, first.order.id);
        assert_eq!(store.order_count().await, 1);
        assert_eq!(notifier.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_create_distinct_orders() {
        let (placement, store, _, _) = setup();

        let first = placement
            .place_order(request(vec![CartLine::new(1u64, 1)]).with_idempotency_key("a"))
            .await
            .unwrap();
        let second = placement
            .place_order(request(vec![CartLine::new(1u64, 1)]).with_idempotency_key("b"))
            .await
            .unwrap();

        assert_ne!(first.order.id, second.order.id);
        assert_eq!(store.order_count().await, 2);
    }

    /// Catalog that answers correctly but far too slowly.
    #[derive(Clone)]
    struct SlowCatalog {
        inner: InMemoryCatalogClient,
    }

    #[async_trait]
    impl CatalogClient for SlowCatalog {
        async fn lookup(&self, product_id: common::ProductId) -> Result<Product, LookupError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.inner.lookup(product_id).await
        }
    }

    #[tokio::test]
    async fn test_deadline_cuts_off_slow_placement() {
        let inner = InMemoryCatalogClient::new();
        inner.insert(Product::new(1u64, "Widget", Money::from_cents(500), 5));
        let store = InMemoryOrderStore::new();

        let placement = OrderPlacement::new(
            store.clone(),
            SlowCatalog { inner },
            InMemoryNotificationService::new(),
            PlacementPolicy {
                deadline: Duration::from_millis(50),
                ..PlacementPolicy::default()
            },
        );

        let err = placement
            .place_order(request(vec![CartLine::new(1u64, 1)]))
            .await
            .unwrap_err();

        assert!(matches!(err, PlacementError::Timeout(_)));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_snapshots_immune_to_later_catalog_edits() {
        let (placement, _, catalog, _) = setup();

        let placed = placement
            .place_order(request(vec![CartLine::new(1u64, 1)]))
            .await
            .unwrap();

        catalog.set_price(common::ProductId::new(1), Money::from_cents(9999));
        catalog.set_stock(common::ProductId::new(1), 0);

        let fetched = placement.get_order(placed.order.id).await.unwrap().unwrap();
        assert_eq!(fetched.items[0].unit_price, Money::from_cents(7999));
        assert_eq!(fetched.total_amount, Money::from_cents(7999));
    }

    #[tokio::test]
    async fn test_get_order_missing_returns_none() {
        let (placement, _, _, _) = setup();

        let result = placement.get_order(OrderId::new()).await.unwrap();
        assert!(result.is_none());
    }
}
