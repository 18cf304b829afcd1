//! services/api/src/adapters/session.rs
//!
//! Server-side sessions behind signed cookies. The cookie only carries the
//! session id and its HMAC; expiry and revocation live in `auth_sessions`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use study_guide_core::domain::{Identity, SessionCookie, SESSION_LIFETIME_DAYS};
use study_guide_core::ports::{PortError, PortResult, SessionService};
use tracing::debug;
use uuid::Uuid;

use crate::adapters::db::DbAdapter;
use crate::adapters::token::TokenSigner;

#[derive(Clone)]
pub struct SignedSessionAdapter {
    db: Arc<DbAdapter>,
    tokens: TokenSigner,
}

impl SignedSessionAdapter {
    pub fn new(db: Arc<DbAdapter>, tokens: TokenSigner) -> Self {
        Self { db, tokens }
    }
}

#[async_trait]
impl SessionService for SignedSessionAdapter {
    async fn create(&self, id_token: &str) -> PortResult<SessionCookie> {
        let now = Utc::now();
        let uid = self
            .tokens
            .verify_id_token(id_token, now)
            .map_err(|e| PortError::Unauthorized(e.to_string()))?;
        if !self.db.user_exists(uid).await? {
            return Err(PortError::Unauthorized(format!("User {} no longer exists", uid)));
        }

        let lifetime = Duration::days(SESSION_LIFETIME_DAYS);
        let session_id = Uuid::new_v4();
        self.db
            .create_auth_session(session_id, uid, now + lifetime)
            .await?;
        let value = self
            .tokens
            .sign_session(session_id)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(SessionCookie {
            value,
            max_age_seconds: lifetime.num_seconds(),
        })
    }

    async fn verify(&self, cookie: &str) -> PortResult<Identity> {
        let session_id = self
            .tokens
            .open_session(cookie)
            .map_err(|e| PortError::Unauthorized(e.to_string()))?;
        self.db
            .find_session_identity(session_id, Utc::now())
            .await
            .map_err(|e| match e {
                PortError::NotFound(detail) => PortError::Unauthorized(detail),
                other => other,
            })
    }

    async fn revoke(&self, cookie: &str) -> PortResult<()> {
        match self.tokens.open_session(cookie) {
            Ok(session_id) => self.db.revoke_auth_session(session_id).await,
            Err(e) => {
                debug!("Ignoring revocation of an unsigned cookie: {}", e);
                Ok(())
            }
        }
    }
}
