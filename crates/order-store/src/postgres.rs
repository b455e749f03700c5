use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId};
use domain::{EmailAddress, Money, NewOrder, Order, OrderItem, OrderStatus};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{Result, StoreError, store::OrderStore};

/// Partial unique index guarding idempotency keys.
const IDEMPOTENCY_CONSTRAINT: &str = "uq_orders_idempotency_key";

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: &PgRow, items: Vec<OrderItem>) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let status: OrderStatus = status
            .parse()
            .map_err(|e: domain::DomainError| StoreError::InvalidRow(e.to_string()))?;
        let email: String = row.try_get("customer_email")?;
        let customer_email =
            EmailAddress::parse(email).map_err(|e| StoreError::InvalidRow(e.to_string()))?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_email,
            items,
            total_amount: Money::from_cents(row.try_get("total_cents")?),
            status,
            idempotency_key: row.try_get("idempotency_key")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }

    fn row_to_item(row: &PgRow) -> Result<OrderItem> {
        Ok(OrderItem {
            product_id: ProductId::new(row.try_get::<i64, _>("product_id")? as u64),
            product_name: row.try_get("product_name")?,
            quantity: row.try_get::<i32, _>("quantity")? as u32,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        })
    }

    async fn load_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, product_name, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_item).collect()
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, new_order), fields(items = new_order.items.len()))]
    async fn create(&self, new_order: NewOrder) -> Result<Order> {
        if new_order.items.is_empty() {
            return Err(StoreError::EmptyOrder);
        }

        let order_id = OrderId::new();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_email, total_cents, status, idempotency_key, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(new_order.customer_email.as_str())
        .bind(new_order.total_amount.cents())
        .bind(new_order.status.as_str())
        .bind(&new_order.idempotency_key)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            // A unique violation on the key index means another order won the claim
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some(IDEMPOTENCY_CONSTRAINT)
                && let Some(key) = &new_order.idempotency_key
            {
                return StoreError::IdempotencyConflict(key.clone());
            }
            StoreError::Database(e)
        })?;

        for (position, item) in new_order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, position, product_id, product_name, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order_id.as_uuid())
            .bind(position as i32)
            .bind(item.product_id.as_u64() as i64)
            .bind(&item.product_name)
            .bind(item.quantity as i32)
            .bind(item.unit_price.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Order {
            id: order_id,
            customer_email: new_order.customer_email,
            items: new_order.items,
            total_amount: new_order.total_amount,
            status: new_order.status,
            idempotency_key: new_order.idempotency_key,
            created_at: now,
            updated_at: now,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_email, total_cents, status, idempotency_key, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let items = self.load_items(order_id).await?;
                Ok(Some(Self::row_to_order(&row, items)?))
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self, key))]
    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Order>> {
        let id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM orders WHERE idempotency_key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        match id {
            Some(id) => self.get(OrderId::from_uuid(id)).await,
            None => Ok(None),
        }
    }
}
