//! crates/study_guide_core/src/accounts.rs
//!
//! Registration, login and logout on top of the identity provider and the
//! session service.

use std::ops::RangeInclusive;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{Identity, NewAccount, SessionCookie, UserProfile};
use crate::error::{DomainError, DomainResult};
use crate::ports::{IdentityProvider, PortError, SessionService, UserDirectory};
use crate::validation;

pub const USERNAME_CHARS: RangeInclusive<usize> = 3..=20;
pub const MIN_PASSWORD_CHARS: usize = 6;

/// A fresh session for a user who just logged in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginOutcome {
    pub uid: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub cookie: SessionCookie,
}

#[derive(Clone)]
pub struct AccountService {
    identity: Arc<dyn IdentityProvider>,
    sessions: Arc<dyn SessionService>,
    users: Arc<dyn UserDirectory>,
}

impl AccountService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        sessions: Arc<dyn SessionService>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            identity,
            sessions,
            users,
        }
    }

    pub async fn register(&self, raw: &Value) -> DomainResult<UserProfile> {
        let record = validation::non_empty_record(raw)?;
        let username = validation::optional_text(record, "username")?.unwrap_or_default();
        let email = validation::optional_text(record, "email")?.unwrap_or_default();
        let password = match record.get("password") {
            Some(Value::String(p)) => p.clone(),
            _ => String::new(),
        };

        check_username(&username)?;
        check_password(&password)?;
        check_email(&email)?;

        let account = NewAccount {
            username,
            email,
            password,
        };
        let profile = self
            .identity
            .create_account(&account)
            .await
            .map_err(|e| match e {
                PortError::Conflict(detail) => DomainError::conflict(
                    conflict_message(&detail),
                    "Choose another value and try again.",
                ),
                other => {
                    warn!("Account creation failed: {}", other);
                    DomainError::service("The user could not be created.", "Try again later.")
                }
            })?;
        info!(username = %profile.username, "User registered");
        Ok(profile)
    }

    pub async fn login(&self, raw: &Value) -> DomainResult<LoginOutcome> {
        let record = validation::non_empty_record(raw)?;
        let email = validation::optional_text(record, "email")?.unwrap_or_default();
        let password = match record.get("password") {
            Some(Value::String(p)) => p.clone(),
            _ => String::new(),
        };
        if email.is_empty() || password.is_empty() {
            return Err(DomainError::validation(
                "Email and password are required.",
                "Check the data and try again.",
            ));
        }

        let user = self
            .identity
            .authenticate(&email, &password)
            .await
            .map_err(|e| match e {
                PortError::Unauthorized(_) | PortError::NotFound(_) => {
                    DomainError::unauthorized(
                        "The email or password is wrong.",
                        "Check the data and try again.",
                    )
                }
                other => {
                    warn!("Authentication failed: {}", other);
                    DomainError::service(
                        "The authentication service is unavailable.",
                        "Try again later.",
                    )
                }
            })?;

        let cookie = self.sessions.create(&user.id_token).await.map_err(|e| match e {
            PortError::Unauthorized(_) => DomainError::unauthorized(
                "The session could not be created.",
                "Log in again.",
            ),
            other => {
                warn!("Session creation failed: {}", other);
                DomainError::service("The session could not be created.", "Try again later.")
            }
        })?;

        info!(username = %user.display_name, "Session created");
        Ok(LoginOutcome {
            uid: user.uid,
            username: user.display_name,
            email: user.email,
            cookie,
        })
    }

    /// Revokes the session behind `cookie`, if any. Logging out never fails:
    /// a stale or unknown cookie is simply dropped.
    pub async fn logout(&self, cookie: Option<&str>) {
        if let Some(cookie) = cookie.filter(|c| !c.is_empty()) {
            if let Err(e) = self.sessions.revoke(cookie).await {
                warn!("Session revocation failed: {}", e);
            }
        }
    }

    /// Looks up a user by username, checking its shape first.
    pub async fn find_user(&self, username: &str) -> DomainResult<UserProfile> {
        check_username(username)?;
        self.users
            .find_user_by_username(username)
            .await
            .map_err(|e| match e {
                PortError::NotFound(_) => DomainError::not_found(
                    "The user was not found.",
                    "Check the username spelling and try again.",
                ),
                other => other.into(),
            })
    }

    pub async fn current_user(&self, identity: &Identity) -> DomainResult<UserProfile> {
        self.find_user(&identity.username).await
    }
}

pub fn check_username(username: &str) -> DomainResult<()> {
    let valid_chars = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if !USERNAME_CHARS.contains(&username.chars().count()) || !valid_chars {
        return Err(DomainError::validation(
            "The username is not valid.",
            format!(
                "Use between {} and {} letters, digits, '_', '.' or '-'.",
                USERNAME_CHARS.start(),
                USERNAME_CHARS.end()
            ),
        ));
    }
    Ok(())
}

fn check_password(password: &str) -> DomainResult<()> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(DomainError::validation(
            "The password is too short.",
            format!("Use a password with at least {} characters.", MIN_PASSWORD_CHARS),
        ));
    }
    Ok(())
}

fn check_email(email: &str) -> DomainResult<()> {
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if !well_formed || email.chars().any(char::is_whitespace) {
        return Err(DomainError::validation(
            "The email is not valid.",
            "Check the email and try again.",
        ));
    }
    Ok(())
}

fn conflict_message(detail: &str) -> String {
    if detail.contains("email") {
        "The email is already in use.".to_string()
    } else if detail.contains("username") {
        "The username is already in use.".to_string()
    } else {
        "The account already exists.".to_string()
    }
}
