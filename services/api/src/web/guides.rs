//! services/api/src/web/guides.rs
//!
//! Guide endpoints. Every route here sits behind `require_auth`.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::Value;
use std::sync::Arc;
use study_guide_core::{DomainError, Identity};
use uuid::Uuid;

use crate::error::{ApiError, ErrorBody};
use crate::web::rest::{
    ApiResponse, CreateGuideRequest, DailyStudyUnitDoc, GuideDoc, GuideSummaryDoc,
    MessageResponse, UpdateStudiesRequest,
};
use crate::web::state::AppState;

/// Guide ids that do not parse can never exist.
fn guide_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        ApiError::Domain(DomainError::not_found(
            "Guide not found.",
            "Check the ID and try again.",
        ))
    })
}

/// POST /guides - Validate the inputs, generate a plan and store the guide
#[utoipa::path(
    post,
    path = "/api/v1/guides",
    request_body = CreateGuideRequest,
    responses(
        (status = 201, description = "Guide generated", body = GuideDoc),
        (status = 400, description = "Invalid inputs or irrelevant topic", body = ErrorBody),
        (status = 401, description = "No valid session", body = ErrorBody),
        (status = 503, description = "Every model failed", body = ErrorBody)
    )
)]
pub async fn create_guide_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let guide = state.guides.create(&identity, &body).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_data("Study guide generated successfully.", guide)),
    ))
}

/// GET /guides/{segment} - A guide by id, or the public guides of a user
///
/// A segment that parses as a UUID addresses a guide; anything else is a username.
#[utoipa::path(
    get,
    path = "/api/v1/guides/{segment}",
    params(("segment" = String, Path, description = "Guide id or username")),
    responses(
        (status = 200, description = "The guide, or the user's public guide summaries", body = GuideDoc),
        (status = 400, description = "Malformed username", body = ErrorBody),
        (status = 403, description = "Private guide of another user", body = ErrorBody),
        (status = 404, description = "Unknown guide or user", body = ErrorBody)
    )
)]
pub async fn get_guide_or_user_guides_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(segment): Path<String>,
) -> Result<Response, ApiError> {
    if let Ok(id) = Uuid::parse_str(&segment) {
        let guide = state.guides.read(id, &identity).await?;
        return Ok(Json(ApiResponse::with_data("Guide retrieved successfully.", guide)).into_response());
    }

    let user = state.accounts.find_user(&segment).await?;
    let summaries = state.guides.find_by_owner(&user.username, true).await?;
    Ok(Json(ApiResponse::with_data("Guides retrieved successfully.", summaries)).into_response())
}

/// GET /my-guides - Summaries of the caller's guides, newest first
#[utoipa::path(
    get,
    path = "/api/v1/my-guides",
    responses(
        (status = 200, description = "Guide summaries", body = [GuideSummaryDoc]),
        (status = 401, description = "No valid session", body = ErrorBody)
    )
)]
pub async fn list_my_guides_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let summaries = state.guides.find_by_owner(&identity.username, false).await?;

    Ok(Json(ApiResponse::with_data(
        "Guides retrieved successfully.",
        summaries,
    )))
}

/// PATCH /guides/{id} - Replace the daily study list
#[utoipa::path(
    patch,
    path = "/api/v1/guides/{segment}",
    params(("segment" = Uuid, Path, description = "Guide id")),
    request_body = UpdateStudiesRequest,
    responses(
        (status = 200, description = "The stored daily study list", body = [DailyStudyUnitDoc]),
        (status = 400, description = "List does not match the guide", body = ErrorBody),
        (status = 403, description = "Guide of another user", body = ErrorBody),
        (status = 404, description = "Unknown guide", body = ErrorBody)
    )
)]
pub async fn update_studies_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(segment): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = guide_id(&segment)?;
    let Json(body) = payload?;
    let new_units = body.get("new_studies_list").cloned().unwrap_or(Value::Null);
    let units = state
        .guides
        .update_studies(id, &new_units, &identity)
        .await?;

    Ok(Json(ApiResponse::with_data(
        "Daily studies updated successfully.",
        units,
    )))
}

/// DELETE /guides/{id} - Delete one of the caller's guides
#[utoipa::path(
    delete,
    path = "/api/v1/guides/{segment}",
    params(("segment" = Uuid, Path, description = "Guide id")),
    responses(
        (status = 200, description = "Guide deleted", body = MessageResponse),
        (status = 403, description = "Guide of another user", body = ErrorBody),
        (status = 404, description = "Unknown guide", body = ErrorBody)
    )
)]
pub async fn delete_guide_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(segment): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = guide_id(&segment)?;
    state.guides.delete(id, &identity).await?;

    Ok(Json(ApiResponse::message("Study guide deleted successfully.")))
}
