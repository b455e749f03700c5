//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and serialize on it, so
//! they can run with the default test runner:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration
//! ```

use std::sync::Arc;

use common::{OrderId, ProductId};
use domain::{EmailAddress, Money, NewOrder, OrderItem, OrderStatus};
use order_store::{OrderStore, PostgresOrderStore, StoreError};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Run migrations using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!("../../../migrations/001_create_orders_tables.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresOrderStore {
    let info = get_container_info().await;

    // Create a fresh pool for each test to avoid connection issues
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query("TRUNCATE TABLE order_items, orders")
        .execute(&pool)
        .await
        .unwrap();

    PostgresOrderStore::new(pool)
}

fn sample_new_order() -> NewOrder {
    NewOrder::confirmed(
        EmailAddress::parse("customer@example.com").unwrap(),
        vec![
            OrderItem::new(
                ProductId::new(1),
                "Mechanical Keyboard",
                2,
                Money::from_cents(7999),
            ),
            OrderItem::new(ProductId::new(2), "USB Cable", 1, Money::from_cents(500)),
        ],
    )
    .unwrap()
}

async fn order_row_count(store: &PostgresOrderStore) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(store.pool())
        .await
        .unwrap()
}

async fn item_row_count(store: &PostgresOrderStore) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM order_items")
        .fetch_one(store.pool())
        .await
        .unwrap()
}

#[tokio::test]
#[serial]
async fn create_and_get_roundtrip() {
    let store = get_test_store().await;

    let created = store.create(sample_new_order()).await.unwrap();
    let loaded = store.get(created.id).await.unwrap().unwrap();

    assert_eq!(loaded.id, created.id);
    assert_eq!(loaded.customer_email.as_str(), "customer@example.com");
    assert_eq!(loaded.status, OrderStatus::Confirmed);
    assert_eq!(loaded.total_amount.cents(), 16498);
    assert_eq!(loaded.items, created.items);
}

#[tokio::test]
#[serial]
async fn items_come_back_in_submission_order() {
    let store = get_test_store().await;

    let items: Vec<OrderItem> = (1..=5)
        .map(|i| {
            OrderItem::new(
                ProductId::new(i),
                format!("Product {i}"),
                1,
                Money::from_cents(100 * i as i64),
            )
        })
        .collect();
    let new_order = NewOrder::confirmed(
        EmailAddress::parse("customer@example.com").unwrap(),
        items.clone(),
    )
    .unwrap();

    let created = store.create(new_order).await.unwrap();
    let loaded = store.get(created.id).await.unwrap().unwrap();

    assert_eq!(loaded.items, items);
}

#[tokio::test]
#[serial]
async fn snapshots_survive_roundtrip_exactly() {
    let store = get_test_store().await;

    let created = store.create(sample_new_order()).await.unwrap();
    let loaded = store.get(created.id).await.unwrap().unwrap();

    assert_eq!(loaded.items[0].product_name, "Mechanical Keyboard");
    assert_eq!(loaded.items[0].unit_price.to_decimal_string(), "79.99");
    assert_eq!(loaded.items[0].quantity, 2);
    assert_eq!(loaded.total_amount.to_decimal_string(), "164.98");
}

#[tokio::test]
#[serial]
async fn create_rejects_empty_orders() {
    let store = get_test_store().await;
    let empty = NewOrder {
        customer_email: EmailAddress::parse("customer@example.com").unwrap(),
        items: vec![],
        total_amount: Money::zero(),
        status: OrderStatus::Confirmed,
        idempotency_key: None,
    };

    let result = store.create(empty).await;

    assert!(matches!(result, Err(StoreError::EmptyOrder)));
    assert_eq!(order_row_count(&store).await, 0);
}

#[tokio::test]
#[serial]
async fn create_rolls_back_order_row_when_item_insert_fails() {
    let store = get_test_store().await;

    // Bypass domain validation so the item insert trips the quantity check
    let poisoned = NewOrder {
        customer_email: EmailAddress::parse("customer@example.com").unwrap(),
        items: vec![
            OrderItem::new(ProductId::new(1), "Mechanical Keyboard", 1, Money::from_cents(7999)),
            OrderItem::new(ProductId::new(2), "USB Cable", 0, Money::from_cents(500)),
        ],
        total_amount: Money::from_cents(7999),
        status: OrderStatus::Confirmed,
        idempotency_key: None,
    };

    let result = store.create(poisoned).await;

    assert!(matches!(result, Err(StoreError::Database(_))));
    assert_eq!(order_row_count(&store).await, 0);
    assert_eq!(item_row_count(&store).await, 0);
}

#[tokio::test]
#[serial]
async fn idempotency_key_can_only_be_claimed_once() {
    let store = get_test_store().await;

    let first = store
        .create(sample_new_order().with_idempotency_key("checkout-1"))
        .await
        .unwrap();
    let second = store
        .create(sample_new_order().with_idempotency_key("checkout-1"))
        .await;

    assert!(matches!(
        second,
        Err(StoreError::IdempotencyConflict(key)) if key == "checkout-1"
    ));
    assert_eq!(order_row_count(&store).await, 1);

    let found = store
        .find_by_idempotency_key("checkout-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, first.id);
}

#[tokio::test]
#[serial]
async fn distinct_idempotency_keys_do_not_conflict() {
    let store = get_test_store().await;

    store
        .create(sample_new_order().with_idempotency_key("checkout-1"))
        .await
        .unwrap();
    store
        .create(sample_new_order().with_idempotency_key("checkout-2"))
        .await
        .unwrap();
    // Keyless orders never participate in idempotency claims
    store.create(sample_new_order()).await.unwrap();
    store.create(sample_new_order()).await.unwrap();

    assert_eq!(order_row_count(&store).await, 4);
}

#[tokio::test]
#[serial]
async fn find_by_unknown_idempotency_key_returns_none() {
    let store = get_test_store().await;
    assert!(
        store
            .find_by_idempotency_key("never-used")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
#[serial]
async fn get_unknown_order_returns_none() {
    let store = get_test_store().await;
    assert!(store.get(OrderId::new()).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn deleting_an_order_cascades_to_its_items() {
    let store = get_test_store().await;

    let created = store.create(sample_new_order()).await.unwrap();
    assert_eq!(item_row_count(&store).await, 2);

    sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(created.id.as_uuid())
        .execute(store.pool())
        .await
        .unwrap();

    assert_eq!(item_row_count(&store).await, 0);
}
