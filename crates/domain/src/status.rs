//! Order status lifecycle.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The status of a placed order.
///
/// Status transitions:
/// ```text
/// Pending ──┬──► Confirmed
///           └──► Failed
/// ```
///
/// The checkout flow only ever persists orders that already reached
/// `Confirmed`; `Pending` and `Failed` are reachable through imported
/// rows or manual intervention only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order has been recorded but not yet confirmed.
    #[default]
    Pending,

    /// Stock was validated and the order is persisted (terminal state).
    Confirmed,

    /// The order could not be completed (terminal state).
    Failed,
}

impl OrderStatus {
    /// Returns true if the order can be confirmed from this status.
    pub fn can_confirm(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if the order can be failed from this status.
    pub fn can_fail(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if this is a terminal status (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Confirmed | OrderStatus::Failed)
    }

    /// Returns the status name as stored and served over the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "failed" => Ok(OrderStatus::Failed),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}
