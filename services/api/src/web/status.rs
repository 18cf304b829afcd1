//! services/api/src/web/status.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::web::rest::{ApiResponse, StatusDoc};
use crate::web::state::AppState;

#[derive(Serialize)]
struct ApiStatus {
    status: &'static str,
}

/// GET /status - Whether the API can reach its document store
#[utoipa::path(
    get,
    path = "/api/v1/status",
    responses(
        (status = 200, description = "The API is online", body = StatusDoc),
        (status = 503, description = "The document store is unreachable", body = StatusDoc)
    )
)]
pub async fn status_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::with_data(
                "The API is online.",
                ApiStatus { status: "online" },
            )),
        ),
        Err(e) => {
            warn!("Status check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::with_data(
                    "The API is offline.",
                    ApiStatus { status: "offline" },
                )),
            )
        }
    }
}
