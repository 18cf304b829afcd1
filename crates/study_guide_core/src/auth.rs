//! crates/study_guide_core/src/auth.rs
//!
//! Resolves callers from session cookies and enforces guide ownership.

use std::sync::Arc;

use tracing::{debug, error};

use crate::domain::{Guide, Identity};
use crate::error::{DomainError, DomainResult};
use crate::ports::{PortError, SessionService};

#[derive(Clone)]
pub struct AuthorizationGuard {
    sessions: Arc<dyn SessionService>,
}

impl AuthorizationGuard {
    pub fn new(sessions: Arc<dyn SessionService>) -> Self {
        Self { sessions }
    }

    /// Resolves the identity behind a session cookie.
    pub async fn resolve(&self, cookie: Option<&str>) -> DomainResult<Identity> {
        let cookie = cookie.map(str::trim).filter(|c| !c.is_empty()).ok_or_else(|| {
            DomainError::unauthorized("Session cookie not found.", "Log in to continue.")
        })?;

        match self.sessions.verify(cookie).await {
            Ok(identity) => Ok(identity),
            Err(PortError::Unauthorized(reason)) | Err(PortError::NotFound(reason)) => {
                debug!("Rejected session cookie: {}", reason);
                Err(DomainError::unauthorized(
                    "The session is invalid, expired or revoked.",
                    "Log in again to continue.",
                ))
            }
            Err(e) => {
                error!("Session verification failed: {}", e);
                Err(DomainError::service(
                    "The authentication service is unavailable.",
                    "Try again later.",
                ))
            }
        }
    }

    /// Ownership is a case-sensitive exact match on the username.
    pub fn ensure_owner(requester: &Identity, guide: &Guide) -> DomainResult<()> {
        if guide.is_owned_by(&requester.username) {
            Ok(())
        } else {
            Err(DomainError::forbidden(
                "You do not have access to this guide.",
                "Access a guide you created and try again.",
            ))
        }
    }
}
