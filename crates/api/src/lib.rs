//! HTTP API server with observability for the storefront checkout.
//!
//! Exposes order placement and lookup endpoints over the checkout
//! orchestrator, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use checkout::{CatalogClient, NotificationService, OrderPlacement, PlacementPolicy};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::OrderStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, C, N>(state: Arc<AppState<S, C, N>>, metrics_handle: PrometheusHandle) -> Router
where
    S: OrderStore + 'static,
    C: CatalogClient + 'static,
    N: NotificationService + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::place::<S, C, N>))
        .route("/orders/{id}", get(routes::orders::get::<S, C, N>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state wiring the placement orchestrator over the
/// given store and collaborator clients.
pub fn build_state<S, C, N>(
    store: S,
    catalog: C,
    notifier: N,
    policy: PlacementPolicy,
) -> Arc<AppState<S, C, N>>
where
    S: OrderStore + 'static,
    C: CatalogClient + 'static,
    N: NotificationService + 'static,
{
    Arc::new(AppState {
        placement: OrderPlacement::new(store, catalog, notifier, policy),
    })
}
