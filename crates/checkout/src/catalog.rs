//! Catalog client trait, HTTP implementation, and in-memory test double.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::ProductId;
use domain::Money;
use serde::Deserialize;
use thiserror::Error;

/// A product as reported by the catalog at lookup time.
///
/// Name and price are the snapshot an order line is built from; stock is
/// only consulted during validation and never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: u32,
}

impl Product {
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Money, stock: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            stock,
        }
    }
}

/// Errors a single catalog lookup can produce.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LookupError {
    /// The catalog has no product with this ID.
    #[error("Product {0} does not exist in the catalog")]
    NotFound(ProductId),

    /// The catalog could not be reached or answered abnormally.
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

/// Trait for product catalog lookups.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetches the current name, price, and stock level for a product.
    async fn lookup(&self, product_id: ProductId) -> Result<Product, LookupError>;
}

/// Catalog client backed by the catalog service's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalogClient {
    /// Creates a client for a catalog service rooted at `base_url`.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn lookup(&self, product_id: ProductId) -> Result<Product, LookupError> {
        let url = format!("{}/products/{product_id}", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::Unavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound(product_id));
        }
        if !response.status().is_success() {
            return Err(LookupError::Unavailable(format!(
                "catalog returned {}",
                response.status()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| LookupError::Unavailable(e.to_string()))?;

        decode_product(product_id, &body)
    }
}

/// Response envelope the catalog wraps every product payload in.
#[derive(Deserialize)]
struct Envelope {
    success: bool,
    data: Option<ProductData>,
}

#[derive(Deserialize)]
struct ProductData {
    name: String,
    price: NumberOrString,
    stock: NumberOrString,
}

/// The catalog serializes numeric fields inconsistently, sometimes as JSON
/// numbers and sometimes as quoted strings. Accept both.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

impl NumberOrString {
    fn into_money(self) -> Result<Money, LookupError> {
        match self {
            Self::Number(n) if n.is_finite() => Ok(Money::from_f64_lossy(n)),
            Self::Number(n) => Err(LookupError::Unavailable(format!(
                "catalog sent non-finite price {n}"
            ))),
            Self::String(s) => s
                .parse::<Money>()
                .map_err(|_| LookupError::Unavailable(format!("catalog sent bad price {s:?}"))),
        }
    }

    fn into_stock(self) -> Result<u32, LookupError> {
        match self {
            Self::Number(n) if n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX) => {
                Ok(n as u32)
            }
            Self::Number(n) => Err(LookupError::Unavailable(format!(
                "catalog sent bad stock {n}"
            ))),
            Self::String(s) => s
                .trim()
                .parse::<u32>()
                .map_err(|_| LookupError::Unavailable(format!("catalog sent bad stock {s:?}"))),
        }
    }
}

/// Decodes a catalog response body into a [`Product`].
///
/// A well-formed envelope with `success: false` or missing data means the
/// product does not exist, same as an HTTP 404.
fn decode_product(product_id: ProductId, body: &[u8]) -> Result<Product, LookupError> {
    let envelope: Envelope = serde_json::from_slice(body)
        .map_err(|e| LookupError::Unavailable(format!("catalog sent invalid JSON: {e}")))?;

    if let Envelope {
        success: true,
        data: Some(data),
    } = envelope
    {
        Ok(Product {
            id: product_id,
            name: data.name,
            price: data.price.into_money()?,
            stock: data.stock.into_stock()?,
        })
    } else {
        Err(LookupError::NotFound(product_id))
    }
}

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    products: HashMap<ProductId, Product>,
    unavailable: bool,
    lookups: u64,
}

/// In-memory catalog client for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogClient {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl InMemoryCatalogClient {
    /// Creates an empty in-memory catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a product.
    pub fn insert(&self, product: Product) {
        let mut state = self.state.write().unwrap();
        state.products.insert(product.id, product);
    }

    /// Overwrites the stock level of an existing product.
    pub fn set_stock(&self, product_id: ProductId, stock: u32) {
        let mut state = self.state.write().unwrap();
        if let Some(product) = state.products.get_mut(&product_id) {
            product.stock = stock;
        }
    }

    /// Overwrites the price of an existing product.
    pub fn set_price(&self, product_id: ProductId, price: Money) {
        let mut state = self.state.write().unwrap();
        if let Some(product) = state.products.get_mut(&product_id) {
            product.price = price;
        }
    }

    /// Removes a product, as if it were deleted from the catalog.
    pub fn remove(&self, product_id: ProductId) {
        let mut state = self.state.write().unwrap();
        state.products.remove(&product_id);
    }

    /// Configures every subsequent lookup to fail as unavailable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.write().unwrap().unavailable = unavailable;
    }

    /// Returns the number of lookups served, including failed ones.
    pub fn lookup_count(&self) -> u64 {
        self.state.read().unwrap().lookups
    }
}

#[async_trait]
impl CatalogClient for InMemoryCatalogClient {
    async fn lookup(&self, product_id: ProductId) -> Result<Product, LookupError> {
        let mut state = self.state.write().unwrap();
        state.lookups += 1;

        if state.unavailable {
            return Err(LookupError::Unavailable("simulated outage".to_string()));
        }

        state
            .products
            .get(&product_id)
            .cloned()
            .ok_or(LookupError::NotFound(product_id))
    }
}
