//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and its mapping
//! onto the uniform JSON error body.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use study_guide_core::{DomainError, PortError};
use tracing::error;
use utoipa::ToSchema;

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A classified failure from the core services.
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A request body that is not valid JSON.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Error kind, e.g. `ValidationError`.
    pub name: String,
    pub message: String,
    /// What the client can do about it.
    pub action: String,
    /// Mirrors the HTTP status code.
    pub code: u16,
}

impl ApiError {
    fn domain_status(err: &DomainError) -> StatusCode {
        match err {
            DomainError::Validation { .. } => StatusCode::BAD_REQUEST,
            DomainError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            DomainError::Forbidden { .. } => StatusCode::FORBIDDEN,
            DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
            DomainError::Conflict { .. } => StatusCode::CONFLICT,
            DomainError::Service { .. } => StatusCode::SERVICE_UNAVAILABLE,
            DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Status code and body for this error. Unclassified errors are logged here
    /// and never leak their detail to the client.
    pub fn to_body(&self) -> (StatusCode, ErrorBody) {
        let domain = match self {
            ApiError::Domain(err) => err.clone(),
            ApiError::Port(err) => DomainError::from(err.clone()),
            ApiError::BadRequest(detail) => DomainError::validation(
                format!("The request body is not valid JSON: {}", detail),
                "Send a JSON object and try again.",
            ),
            other => DomainError::Internal(other.to_string()),
        };
        if let DomainError::Internal(detail) = &domain {
            error!("Internal error: {}", detail);
        }

        let status = Self::domain_status(&domain);
        let body = ErrorBody {
            name: domain.name().to_string(),
            message: domain.message().to_string(),
            action: domain.action().to_string(),
            code: status.as_u16(),
        };
        (status, body)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.to_body();
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_guide_core::error::INTERNAL_MESSAGE;

    #[test]
    fn domain_errors_keep_their_message_and_status() {
        let (status, body) =
            ApiError::from(DomainError::forbidden("No access.", "Use your own guide.")).to_body();

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.name, "ForbiddenError");
        assert_eq!(body.message, "No access.");
        assert_eq!(body.action, "Use your own guide.");
        assert_eq!(body.code, 403);
    }

    #[test]
    fn service_errors_are_unavailable() {
        let (status, body) =
            ApiError::from(DomainError::service("Quota exceeded.", "Wait.")).to_body();

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.code, 503);
    }

    #[test]
    fn internal_details_are_hidden() {
        let (status, body) =
            ApiError::Internal("connection string postgres://secret".to_string()).to_body();

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.name, "InternalServerError");
        assert!(!body.message.contains("secret"));
        assert_eq!(body.message, INTERNAL_MESSAGE);
    }

    #[test]
    fn port_not_found_maps_to_404() {
        let (status, _) = ApiError::from(PortError::NotFound("guide".to_string())).to_body();

        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
