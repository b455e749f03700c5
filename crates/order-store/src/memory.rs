use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::OrderId;
use domain::{NewOrder, Order};
use tokio::sync::RwLock;

use crate::{Result, StoreError, store::OrderStore};

/// In-memory order store implementation for testing.
///
/// This implementation enforces the same constraints as the PostgreSQL
/// implementation (non-empty orders, unique idempotency keys, atomic
/// writes) and adds a switch for simulating storage failures.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<State>>,
}

#[derive(Default)]
struct State {
    orders: HashMap<OrderId, Order>,
    idempotency_keys: HashMap<String, OrderId>,
    fail_on_create: bool,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Makes subsequent `create` calls fail as if the database were down.
    pub async fn set_fail_on_create(&self, fail: bool) {
        self.state.write().await.fail_on_create = fail;
    }

    /// Clears all orders and idempotency claims.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.orders.clear();
        state.idempotency_keys.clear();
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, new_order: NewOrder) -> Result<Order> {
        let mut state = self.state.write().await;

        if state.fail_on_create {
            return Err(StoreError::Unavailable(
                "simulated create failure".to_string(),
            ));
        }
        if new_order.items.is_empty() {
            return Err(StoreError::EmptyOrder);
        }
        if let Some(key) = &new_order.idempotency_key
            && state.idempotency_keys.contains_key(key)
        {
            return Err(StoreError::IdempotencyConflict(key.clone()));
        }

        let now = Utc::now();
        let order = Order {
            id: OrderId::new(),
            customer_email: new_order.customer_email,
            items: new_order.items,
            total_amount: new_order.total_amount,
            status: new_order.status,
            idempotency_key: new_order.idempotency_key,
            created_at: now,
            updated_at: now,
        };

        if let Some(key) = &order.idempotency_key {
            state.idempotency_keys.insert(key.clone(), order.id);
        }
        state.orders.insert(order.id, order.clone());

        Ok(order)
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.get(&order_id).cloned())
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Order>> {
        let state = self.state.read().await;
        let order = state
            .idempotency_keys
            .get(key)
            .and_then(|id| state.orders.get(id))
            .cloned();
        Ok(order)
    }
}
