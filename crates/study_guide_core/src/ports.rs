//! crates/study_guide_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture: the document
//! store, the identity provider, the session service and the completion service
//! are all external collaborators injected behind them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{
    AuthenticatedUser, DailyStudyUnit, Guide, GuideDraft, GuideStatus, Identity, NewAccount,
    SessionCookie, UserProfile,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// 429-class response: rate limited or quota exhausted.
    #[error("Rate limited: {0}")]
    RateLimited(String),
    /// 503-class response: the provider is overloaded or unavailable.
    #[error("Service overloaded: {0}")]
    Overloaded(String),
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    /// The provider answered, but not with what was asked for.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// Whether a different model may succeed where this one failed.
    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::RateLimited(_) | PortError::Overloaded(_))
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Collection-based persistence for guides.
#[async_trait]
pub trait GuideStore: Send + Sync {
    /// Persists a draft as `studying`, assigning the id and the server timestamp.
    async fn insert_guide(&self, draft: GuideDraft) -> PortResult<Guide>;

    /// Loads a guide regardless of its status. `NotFound` if no such id.
    async fn get_guide(&self, id: Uuid) -> PortResult<Guide>;

    /// Non-deleted guides of `owner`, newest first.
    async fn list_guides_by_owner(&self, owner: &str, only_public: bool)
        -> PortResult<Vec<Guide>>;

    /// Overwrites the unit list together with the recomputed status.
    async fn replace_daily_study(
        &self,
        id: Uuid,
        daily_study: &[DailyStudyUnit],
        status: GuideStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> PortResult<()>;

    async fn set_status(&self, id: Uuid, status: GuideStatus) -> PortResult<()>;

    /// Cheap round trip used by the status endpoint.
    async fn ping(&self) -> PortResult<()>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> PortResult<UserProfile>;
}

/// Authenticates credentials and issues a short-lived opaque id token.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Conflict` when the username or email is already taken.
    async fn create_account(&self, account: &NewAccount) -> PortResult<UserProfile>;

    /// `Unauthorized` when the credentials do not match.
    async fn authenticate(&self, email: &str, password: &str) -> PortResult<AuthenticatedUser>;
}

/// Exchanges id tokens for session cookies and resolves cookies back to identities.
#[async_trait]
pub trait SessionService: Send + Sync {
    async fn create(&self, id_token: &str) -> PortResult<SessionCookie>;

    /// `Unauthorized` for malformed, expired or revoked cookies.
    async fn verify(&self, cookie: &str) -> PortResult<Identity>;

    async fn revoke(&self, cookie: &str) -> PortResult<()>;
}

/// One structured-output request against a named model.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system_instruction: String,
    pub prompt: String,
    pub schema_name: String,
    pub schema: serde_json::Value,
    pub temperature: f64,
}

impl CompletionRequest {
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }
}

/// A generative model that answers with a JSON value matching the requested schema.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> PortResult<serde_json::Value>;
}
