//! services/api/src/web/validations.rs

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use study_guide_core::validation;
use study_guide_core::TopicVerdict;

use crate::error::{ApiError, ErrorBody};
use crate::web::rest::{ApiResponse, TopicRequest, TopicValidationDoc};
use crate::web::state::AppState;

#[derive(Serialize)]
struct TopicValidation {
    topic: String,
    info: TopicVerdict,
}

/// POST /validations/topic - Check that a topic is a real subject of study
#[utoipa::path(
    post,
    path = "/api/v1/validations/topic",
    request_body = TopicRequest,
    responses(
        (status = 200, description = "The topic is valid", body = TopicValidationDoc),
        (status = 400, description = "Invalid or irrelevant topic", body = ErrorBody),
        (status = 503, description = "No model could classify the topic", body = ErrorBody)
    )
)]
pub async fn validate_topic_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let record = validation::non_empty_record(&body)?;
    let raw_topic = validation::optional_text(record, "topic")?.unwrap_or_default();
    let (topic, info) = state.validation.validate_topic(&raw_topic).await?;

    Ok(Json(ApiResponse::with_data(
        "The topic is valid.",
        TopicValidation { topic, info },
    )))
}
