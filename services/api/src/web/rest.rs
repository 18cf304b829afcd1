//! services/api/src/web/rest.rs
//!
//! The success envelope shared by all REST handlers, the schema-only payload
//! structs, and the master definition for the OpenAPI specification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::error::ErrorBody;
use crate::web::{auth, guides, status, validations};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        guides::create_guide_handler,
        guides::get_guide_or_user_guides_handler,
        guides::list_my_guides_handler,
        guides::update_studies_handler,
        guides::delete_guide_handler,
        validations::validate_topic_handler,
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::current_user_handler,
        status::status_handler,
    ),
    components(
        schemas(
            ErrorBody,
            MessageResponse,
            CreateGuideRequest,
            UpdateStudiesRequest,
            TopicRequest,
            RegisterRequest,
            LoginRequest,
            DailyStudyUnitDoc,
            GuideDoc,
            GuideInputsDoc,
            GuideSummaryDoc,
            TopicVerdictDoc,
            TopicValidationDoc,
            UserProfileDoc,
            SessionDoc,
            StatusDoc,
        )
    ),
    tags(
        (name = "Study Guide API", description = "Generates multi-day study guides and tracks their progress.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Success Envelope
//=========================================================================================

/// `{message, data}`; `data` is omitted for plain acknowledgements.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

//=========================================================================================
// API Request Payloads
//=========================================================================================

/// Handlers read bodies as raw JSON so that validation can report the first
/// failing field; these structs only describe the expected shape.
#[derive(Deserialize, ToSchema)]
pub struct CreateGuideRequest {
    pub title: String,
    pub topic: String,
    /// One of `zero`, `beginner`, `intermediate`.
    pub knowledge: String,
    /// Daily focus time in minutes, 30 to 480.
    pub focus_time: i64,
    /// Number of days, 3 to 30.
    pub days: i64,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub is_public: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateStudiesRequest {
    pub new_studies_list: Vec<DailyStudyUnitDoc>,
}

#[derive(Deserialize, ToSchema)]
pub struct TopicRequest {
    pub topic: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

//=========================================================================================
// API Response Payloads
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DailyStudyUnitDoc {
    pub day: u32,
    pub title: String,
    pub goal: String,
    pub theoretical_research: Vec<String>,
    pub practical_activity: String,
    pub learning_verification: String,
    pub completed: bool,
}

#[derive(Serialize, ToSchema)]
pub struct GuideInputsDoc {
    pub title: String,
    pub topic: String,
    pub knowledge: String,
    pub focus_time: u32,
    pub days: u32,
}

#[derive(Serialize, ToSchema)]
pub struct GuideDoc {
    pub id: Uuid,
    pub owner: String,
    pub title: String,
    pub inputs: GuideInputsDoc,
    pub model: String,
    pub temperature: f64,
    pub daily_study: Vec<DailyStudyUnitDoc>,
    /// One of `studying`, `completed`.
    pub status: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub generation_time_seconds: u64,
}

#[derive(Serialize, ToSchema)]
pub struct GuideSummaryDoc {
    pub id: Uuid,
    pub title: String,
    pub topic: String,
    pub knowledge: String,
    pub days: u32,
    pub completed_days: usize,
    pub status: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct TopicVerdictDoc {
    pub is_valid: bool,
    pub is_relevant: bool,
    pub is_bad_language: bool,
    pub is_gibberish: bool,
    pub motive: String,
}

#[derive(Serialize, ToSchema)]
pub struct TopicValidationDoc {
    pub topic: String,
    pub info: TopicVerdictDoc,
}

#[derive(Serialize, ToSchema)]
pub struct UserProfileDoc {
    pub username: String,
    pub uid: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct SessionDoc {
    pub uid: Uuid,
    pub username: String,
    pub email: String,
    /// Session lifetime in seconds.
    pub expires_in: i64,
}

#[derive(Serialize, ToSchema)]
pub struct StatusDoc {
    /// `online` or `offline`.
    pub status: String,
}
