//! Best-effort order confirmation delivery.
//!
//! Notification runs after the order is committed. Whatever happens here,
//! the order stays placed; failures are recorded and logged, never
//! propagated.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{EmailAddress, Order};
use serde::Serialize;
use thiserror::Error;

/// How long a single confirmation dispatch may take before it is abandoned.
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors a confirmation delivery can produce.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NotificationError {
    /// The notification service could not be reached.
    #[error("Notification transport failed: {0}")]
    Transport(String),

    /// The notification service answered with a non-success status.
    #[error("Notification service rejected the request with status {0}")]
    Rejected(u16),

    /// Delivery did not finish within the dispatch timeout.
    #[error("Notification delivery timed out")]
    TimedOut,
}

/// Trait for sending order confirmations.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Sends a confirmation for a freshly placed order.
    async fn send_order_confirmation(&self, order: &Order) -> Result<(), NotificationError>;
}

/// Notification service backed by the notification service's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpNotificationService {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct ConfirmationRequest<'a> {
    order_id: String,
    customer_email: &'a str,
    order_data: &'a Order,
}

impl HttpNotificationService {
    /// Creates a service client rooted at `base_url`.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }
}

#[async_trait]
impl NotificationService for HttpNotificationService {
    async fn send_order_confirmation(&self, order: &Order) -> Result<(), NotificationError> {
        let url = format!("{}/send-order-confirmation", self.base_url);
        let request = ConfirmationRequest {
            order_id: order.id.to_string(),
            customer_email: order.customer_email.as_str(),
            order_data: order,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(NotificationError::Rejected(response.status().as_u16()))
        }
    }
}

/// Outcome of one dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    Sent,
    Failed,
}

/// Audit record of a single confirmation dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRecord {
    pub order_id: OrderId,
    pub recipient: EmailAddress,
    pub status: DispatchStatus,
    pub error: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl DispatchRecord {
    fn sent(order: &Order) -> Self {
        Self {
            order_id: order.id,
            recipient: order.customer_email.clone(),
            status: DispatchStatus::Sent,
            error: None,
            attempted_at: Utc::now(),
        }
    }

    fn failed(order: &Order, error: &NotificationError) -> Self {
        Self {
            order_id: order.id,
            recipient: order.customer_email.clone(),
            status: DispatchStatus::Failed,
            error: Some(error.to_string()),
            attempted_at: Utc::now(),
        }
    }
}

/// Dispatches confirmations and keeps an in-process audit log.
///
/// `dispatch` is infallible by contract: the outcome is returned as a
/// [`DispatchRecord`] and appended to the log, and the caller decides
/// nothing based on it.
#[derive(Debug)]
pub struct NotificationDispatcher<N: NotificationService> {
    service: N,
    timeout: Duration,
    log: Arc<RwLock<Vec<DispatchRecord>>>,
}

impl<N: NotificationService> NotificationDispatcher<N> {
    /// Creates a dispatcher with the default 10 second timeout.
    pub fn new(service: N) -> Self {
        Self::with_timeout(service, DEFAULT_DISPATCH_TIMEOUT)
    }

    /// Creates a dispatcher with an explicit per-dispatch timeout.
    pub fn with_timeout(service: N, timeout: Duration) -> Self {
        Self {
            service,
            timeout,
            log: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Attempts to deliver a confirmation for `order`.
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn dispatch(&self, order: &Order) -> DispatchRecord {
        let outcome = match tokio::time::timeout(
            self.timeout,
            self.service.send_order_confirmation(order),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(NotificationError::TimedOut),
        };

        let record = match outcome {
            Ok(()) => {
                metrics::counter!("order_notifications_sent_total").increment(1);
                tracing::info!("order confirmation sent");
                DispatchRecord::sent(order)
            }
            Err(e) => {
                metrics::counter!("order_notifications_failed_total").increment(1);
                tracing::warn!(error = %e, "order confirmation delivery failed; order unaffected");
                DispatchRecord::failed(order, &e)
            }
        };

        self.log.write().unwrap().push(record.clone());
        record
    }

    /// All dispatch attempts so far, oldest first.
    pub fn records(&self) -> Vec<DispatchRecord> {
        self.log.read().unwrap().clone()
    }

    /// Number of recorded dispatches with the given outcome.
    pub fn count_with_status(&self, status: DispatchStatus) -> usize {
        self.log
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.status == status)
            .count()
    }
}

#[derive(Debug, Default)]
struct InMemoryNotificationState {
    sent: Vec<OrderId>,
    fail_on_send: bool,
}

/// In-memory notification service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationService {
    state: Arc<RwLock<InMemoryNotificationState>>,
}

impl InMemoryNotificationService {
    /// Creates a new in-memory notification service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to reject every subsequent send.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.state.write().unwrap().fail_on_send = fail;
    }

    /// Returns the number of confirmations delivered.
    pub fn sent_count(&self) -> usize {
        self.state.read().unwrap().sent.len()
    }

    /// Returns the orders confirmed so far, in delivery order.
    pub fn sent_orders(&self) -> Vec<OrderId> {
        self.state.read().unwrap().sent.clone()
    }
}

#[async_trait]
impl NotificationService for InMemoryNotificationService {
    async fn send_order_confirmation(&self, order: &Order) -> Result<(), NotificationError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_send {
            return Err(NotificationError::Rejected(500));
        }

        state.sent.push(order.id);
        Ok(())
    }
}
