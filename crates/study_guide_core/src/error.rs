//! crates/study_guide_core/src/error.rs
//!
//! The user-facing error taxonomy. Every variant that reaches a client carries
//! a message and an actionable hint; the HTTP layer maps the kind to a status.

use crate::ports::PortError;
use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Client-correctable input.
    #[error("{message}")]
    Validation { message: String, action: String },

    /// Missing, expired or revoked session.
    #[error("{message}")]
    Unauthorized { message: String, action: String },

    /// Authenticated, but not allowed to touch this resource.
    #[error("{message}")]
    Forbidden { message: String, action: String },

    #[error("{message}")]
    NotFound { message: String, action: String },

    /// Duplicate value in a unique field.
    #[error("{message}")]
    Conflict { message: String, action: String },

    /// An upstream provider (model, store, identity) failed.
    #[error("{message}")]
    Service { message: String, action: String },

    /// Anything unclassified. The detail is for logs only.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A convenience type alias for `Result<T, DomainError>`.
pub type DomainResult<T> = Result<T, DomainError>;

pub const INTERNAL_MESSAGE: &str = "An unexpected internal error happened.";
pub const INTERNAL_ACTION: &str = "Try again later.";

impl DomainError {
    pub fn validation(message: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            action: action.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
            action: action.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
            action: action.into(),
        }
    }

    pub fn not_found(message: impl Into<String>, action: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            action: action.into(),
        }
    }

    pub fn conflict(message: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            action: action.into(),
        }
    }

    pub fn service(message: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
            action: action.into(),
        }
    }

    /// The error kind as exposed in the `name` field of an error body.
    pub fn name(&self) -> &'static str {
        match self {
            DomainError::Validation { .. } => "ValidationError",
            DomainError::Unauthorized { .. } => "UnauthorizedError",
            DomainError::Forbidden { .. } => "ForbiddenError",
            DomainError::NotFound { .. } => "NotFoundError",
            DomainError::Conflict { .. } => "ConflictError",
            DomainError::Service { .. } => "ServiceError",
            DomainError::Internal(_) => "InternalServerError",
        }
    }

    /// The client-safe message. Internal details are never returned.
    pub fn message(&self) -> &str {
        match self {
            DomainError::Validation { message, .. }
            | DomainError::Unauthorized { message, .. }
            | DomainError::Forbidden { message, .. }
            | DomainError::NotFound { message, .. }
            | DomainError::Conflict { message, .. }
            | DomainError::Service { message, .. } => message,
            DomainError::Internal(_) => INTERNAL_MESSAGE,
        }
    }

    pub fn action(&self) -> &str {
        match self {
            DomainError::Validation { action, .. }
            | DomainError::Unauthorized { action, .. }
            | DomainError::Forbidden { action, .. }
            | DomainError::NotFound { action, .. }
            | DomainError::Conflict { action, .. }
            | DomainError::Service { action, .. } => action,
            DomainError::Internal(_) => INTERNAL_ACTION,
        }
    }
}

/// Generic translation used when a component has nothing more specific to say.
/// Upstream messages are logged, not forwarded.
impl From<PortError> for DomainError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(_) => DomainError::not_found(
                "The requested resource was not found.",
                "Check that the resource exists and try again.",
            ),
            PortError::Conflict(_) => DomainError::conflict(
                "A conflict happened with existing data.",
                "Check that the provided data is unique and try again.",
            ),
            PortError::Unauthorized(_) => DomainError::unauthorized(
                "You are not authorized to access this resource.",
                "Log in and try again.",
            ),
            other => {
                error!("Upstream service failure: {}", other);
                DomainError::service(
                    "An upstream service failed while handling the request.",
                    "Try again later.",
                )
            }
        }
    }
}
