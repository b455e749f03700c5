//! Liveness endpoint for the order placement service.

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health — liveness check for the order placement service.
///
/// Answers as long as the process is up; collaborator reachability is
/// not checked here.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
