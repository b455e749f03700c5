//! Cart validation against live catalog stock.

use std::time::Duration;

use common::ProductId;
use domain::OrderItem;
use futures_util::future;

use crate::catalog::{CatalogClient, LookupError};

/// Delay between catalog lookup attempts for the same line.
const RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// One line of a submitted cart: which product, and how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartLine {
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Why a single cart line failed validation.
///
/// The [`std::fmt::Display`] output is customer-facing and deliberately
/// does not distinguish a missing product from an unreachable catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum LineFailure {
    /// The catalog has no such product.
    NotFound { product_id: ProductId },
    /// The catalog could not answer for this product.
    Unavailable {
        product_id: ProductId,
        reason: String,
    },
    /// The product exists but has fewer units than requested.
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        available: u32,
        requested: u32,
    },
}

impl LineFailure {
    /// The product the failed line referred to.
    pub fn product_id(&self) -> ProductId {
        match self {
            Self::NotFound { product_id }
            | Self::Unavailable { product_id, .. }
            | Self::InsufficientStock { product_id, .. } => *product_id,
        }
    }
}

impl std::fmt::Display for LineFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { product_id } | Self::Unavailable { product_id, .. } => {
                write!(f, "Product with ID {product_id} not found")
            }
            Self::InsufficientStock {
                product_name,
                available,
                requested,
                ..
            } => write!(
                f,
                "Insufficient stock for {product_name}. Available: {available}, Requested: {requested}"
            ),
        }
    }
}

/// Validates cart lines against the catalog and snapshots order items.
///
/// Lookups for all lines run concurrently. Validation never short-circuits:
/// every line is checked and every failure reported, so the customer can
/// fix the whole cart in one pass.
#[derive(Debug, Clone)]
pub struct StockValidator<C: CatalogClient> {
    catalog: C,
    lookup_retries: u32,
}

impl<C: CatalogClient> StockValidator<C> {
    /// Creates a validator that retries an unavailable catalog once per line.
    pub fn new(catalog: C) -> Self {
        Self {
            catalog,
            lookup_retries: 1,
        }
    }

    /// Overrides how many extra lookup attempts an unavailable catalog gets.
    pub fn with_lookup_retries(mut self, retries: u32) -> Self {
        self.lookup_retries = retries;
        self
    }

    /// Checks every line and builds order items from the catalog snapshots.
    ///
    /// On success the returned items carry the name and unit price the
    /// catalog reported at validation time, in cart submission order. On
    /// failure, all failing lines are returned, also in submission order.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn validate(&self, lines: &[CartLine]) -> Result<Vec<OrderItem>, Vec<LineFailure>> {
        let lookups = lines
            .iter()
            .map(|line| self.lookup_with_retry(line.product_id));
        let results = future::join_all(lookups).await;

        let mut items = Vec::with_capacity(lines.len());
        let mut failures = Vec::new();

        for (line, result) in lines.iter().zip(results) {
            match result {
                Ok(product) if product.stock >= line.quantity => {
                    items.push(OrderItem::new(
                        product.id,
                        product.name,
                        line.quantity,
                        product.price,
                    ));
                }
                Ok(product) => failures.push(LineFailure::InsufficientStock {
                    product_id: product.id,
                    product_name: product.name,
                    available: product.stock,
                    requested: line.quantity,
                }),
                Err(LookupError::NotFound(product_id)) => {
                    failures.push(LineFailure::NotFound { product_id });
                }
                Err(LookupError::Unavailable(reason)) => failures.push(LineFailure::Unavailable {
                    product_id: line.product_id,
                    reason,
                }),
            }
        }

        if failures.is_empty() {
            Ok(items)
        } else {
            Err(failures)
        }
    }

    async fn lookup_with_retry(
        &self,
        product_id: ProductId,
    ) -> Result<crate::catalog::Product, LookupError> {
        let mut attempt = 0;
        loop {
            match self.catalog.lookup(product_id).await {
                Err(LookupError::Unavailable(reason)) if attempt < self.lookup_retries => {
                    attempt += 1;
                    metrics::counter!("catalog_lookup_retries_total").increment(1);
                    tracing::warn!(%product_id, attempt, %reason, "retrying catalog lookup");
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
                result => return result,
            }
        }
    }
}
