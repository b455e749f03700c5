//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::PlacementError;
use order_store::StoreError;

/// API-level error type that maps to HTTP responses.
///
/// Placement failures use the storefront error envelope
/// `{success: false, error: {code, message, details?}}`; lookup failures on
/// the read path use the flat `{success: false, message}` shape.
#[derive(Debug)]
pub enum ApiError {
    /// Request failed validation before stock was checked.
    InvalidInput(String),
    /// One or more lines failed stock validation.
    OutOfStock(Vec<String>),
    /// Malformed order ID in the request path.
    BadRequest(String),
    /// No order with the requested ID.
    OrderNotFound,
    /// Placement deadline elapsed before the order was persisted.
    Timeout,
    /// The order could not be persisted; carries the internal cause.
    OrderFailed(String),
    /// Any other failure.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidInput(message) => {
                error_envelope(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_INPUT", &message, &[])
            }
            ApiError::OutOfStock(details) => error_envelope(
                StatusCode::UNPROCESSABLE_ENTITY,
                "INSUFFICIENT_STOCK",
                "Some items are out of stock",
                &details,
            ),
            ApiError::BadRequest(message) => flat_message(StatusCode::BAD_REQUEST, &message),
            ApiError::OrderNotFound => flat_message(StatusCode::NOT_FOUND, "Order not found"),
            ApiError::Timeout => error_envelope(
                StatusCode::GATEWAY_TIMEOUT,
                "PLACEMENT_TIMEOUT",
                "Order placement timed out. Please try again.",
                &[],
            ),
            ApiError::OrderFailed(cause) => {
                tracing::error!(error = %cause, "order placement failed");
                error_envelope(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "ORDER_FAILED",
                    "Failed to process order. Please try again.",
                    &[],
                )
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "internal server error");
                error_envelope(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    &message,
                    &[],
                )
            }
        }
    }
}

fn error_envelope(status: StatusCode, code: &str, message: &str, details: &[String]) -> Response {
    let error = if details.is_empty() {
        serde_json::json!({ "code": code, "message": message })
    } else {
        serde_json::json!({ "code": code, "message": message, "details": details })
    };
    let body = serde_json::json!({ "success": false, "error": error });
    (status, axum::Json(body)).into_response()
}

fn flat_message(status: StatusCode, message: &str) -> Response {
    let body = serde_json::json!({ "success": false, "message": message });
    (status, axum::Json(body)).into_response()
}

impl From<PlacementError> for ApiError {
    fn from(err: PlacementError) -> Self {
        match err {
            PlacementError::InvalidInput(message) => ApiError::InvalidInput(message),
            PlacementError::InsufficientStock(failures) => {
                ApiError::OutOfStock(failures.iter().map(ToString::to_string).collect())
            }
            PlacementError::Timeout(_) => ApiError::Timeout,
            PlacementError::Persistence(e) => ApiError::OrderFailed(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
