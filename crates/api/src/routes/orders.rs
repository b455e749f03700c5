//! Order placement and lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use checkout::{CartLine, CatalogClient, NotificationService, OrderPlacement, PlaceOrder};
use common::OrderId;
use domain::Order;
use order_store::OrderStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S, C, N>
where
    S: OrderStore,
    C: CatalogClient,
    N: NotificationService,
{
    pub placement: OrderPlacement<S, C, N>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub email: String,
    pub items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: u64,
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct PlacedOrderResponse {
    pub success: bool,
    pub data: PlacedOrderData,
    pub message: String,
}

#[derive(Serialize)]
pub struct PlacedOrderData {
    pub order_id: String,
    pub order_number: String,
    pub total_amount: String,
    pub customer_email: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub success: bool,
    pub data: OrderData,
    pub message: String,
}

#[derive(Serialize)]
pub struct OrderData {
    pub id: String,
    pub customer_email: String,
    pub total_amount: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    pub order_items: Vec<OrderItemData>,
}

#[derive(Serialize)]
pub struct OrderItemData {
    pub product_id: u64,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: String,
    pub subtotal: String,
}

// -- Handlers --

/// POST /orders — validate stock, persist, and confirm an order.
#[tracing::instrument(skip(state, req), fields(items = req.items.len()))]
pub async fn place<S, C, N>(
    State(state): State<Arc<AppState<S, C, N>>>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<PlacedOrderResponse>), ApiError>
where
    S: OrderStore + 'static,
    C: CatalogClient + 'static,
    N: NotificationService + 'static,
{
    let lines: Vec<CartLine> = req
        .items
        .iter()
        .map(|item| CartLine::new(item.product_id, item.quantity))
        .collect();

    let mut request = PlaceOrder::new(req.email, lines);
    request.idempotency_key = req.idempotency_key;

    let placed = state.placement.place_order(request).await?;

    // a replayed idempotent resubmission did not create anything new
    let status = if placed.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    let response = PlacedOrderResponse {
        success: true,
        data: PlacedOrderData {
            order_id: placed.order.id.to_string(),
            order_number: placed.order.order_number(),
            total_amount: placed.order.total_amount.to_decimal_string(),
            customer_email: placed.order.customer_email.to_string(),
            status: placed.order.status.to_string(),
            created_at: placed.order.created_at.to_rfc3339(),
        },
        message: "Order placed successfully".to_string(),
    };

    Ok((status, Json(response)))
}

/// GET /orders/{id} — load a placed order with its line items.
#[tracing::instrument(skip(state))]
pub async fn get<S, C, N>(
    State(state): State<Arc<AppState<S, C, N>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: OrderStore + 'static,
    C: CatalogClient + 'static,
    N: NotificationService + 'static,
{
    let order_id = parse_order_id(&id)?;
    let order = state
        .placement
        .get_order(order_id)
        .await?
        .ok_or(ApiError::OrderNotFound)?;

    Ok(Json(order_response(&order)))
}

fn order_response(order: &Order) -> OrderResponse {
    let order_items = order
        .items
        .iter()
        .map(|item| OrderItemData {
            product_id: item.product_id.as_u64(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price.to_decimal_string(),
            subtotal: item.subtotal().to_decimal_string(),
        })
        .collect();

    OrderResponse {
        success: true,
        data: OrderData {
            id: order.id.to_string(),
            customer_email: order.customer_email.to_string(),
            total_amount: order.total_amount.to_decimal_string(),
            status: order.status.to_string(),
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
            order_items,
        },
        message: "Order retrieved successfully".to_string(),
    }
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order ID: {e}")))?;
    Ok(OrderId::from(uuid))
}
