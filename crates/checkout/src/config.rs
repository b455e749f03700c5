//! Checkout configuration loaded from environment variables.

use std::time::Duration;

use crate::catalog::HttpCatalogClient;
use crate::notify::HttpNotificationService;

/// Configuration for the external services and placement limits.
///
/// Reads from environment variables:
/// - `CATALOG_BASE_URL` — catalog service root (default: `"http://localhost:8001"`)
/// - `NOTIFICATION_BASE_URL` — notification service root (default: `"http://localhost:8003"`)
/// - `CATALOG_TIMEOUT_SECS` — per-request catalog timeout (default: `10`)
/// - `NOTIFICATION_TIMEOUT_SECS` — per-request notification timeout (default: `10`)
/// - `PLACEMENT_DEADLINE_SECS` — overall placement deadline (default: `30`)
/// - `LOOKUP_RETRIES` — extra catalog attempts when unavailable (default: `1`)
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub catalog_base_url: String,
    pub notification_base_url: String,
    pub catalog_timeout: Duration,
    pub notification_timeout: Duration,
    pub placement_deadline: Duration,
    pub lookup_retries: u32,
}

impl CheckoutConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            catalog_base_url: std::env::var("CATALOG_BASE_URL")
                .unwrap_or(defaults.catalog_base_url),
            notification_base_url: std::env::var("NOTIFICATION_BASE_URL")
                .unwrap_or(defaults.notification_base_url),
            catalog_timeout: env_secs("CATALOG_TIMEOUT_SECS").unwrap_or(defaults.catalog_timeout),
            notification_timeout: env_secs("NOTIFICATION_TIMEOUT_SECS")
                .unwrap_or(defaults.notification_timeout),
            placement_deadline: env_secs("PLACEMENT_DEADLINE_SECS")
                .unwrap_or(defaults.placement_deadline),
            lookup_retries: std::env::var("LOOKUP_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.lookup_retries),
        }
    }

    /// Builds a catalog client with this config's base URL and timeout.
    pub fn http_catalog_client(&self) -> Result<HttpCatalogClient, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(self.catalog_timeout)
            .build()?;
        Ok(HttpCatalogClient::new(client, self.catalog_base_url.clone()))
    }

    /// Builds a notification service client with this config's base URL and timeout.
    pub fn http_notification_service(&self) -> Result<HttpNotificationService, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(self.notification_timeout)
            .build()?;
        Ok(HttpNotificationService::new(
            client,
            self.notification_base_url.clone(),
        ))
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            catalog_base_url: "http://localhost:8001".to_string(),
            notification_base_url: "http://localhost:8003".to_string(),
            catalog_timeout: Duration::from_secs(10),
            notification_timeout: Duration::from_secs(10),
            placement_deadline: Duration::from_secs(30),
            lookup_retries: 1,
        }
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
}
