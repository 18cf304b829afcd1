//! services/api/src/adapters/identity.rs
//!
//! Password-based identity provider. Passwords are hashed with Argon2 and
//! successful logins receive a short-lived signed id token.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::Utc;
use study_guide_core::domain::{AuthenticatedUser, NewAccount, UserProfile};
use study_guide_core::ports::{IdentityProvider, PortError, PortResult};
use tracing::error;
use uuid::Uuid;

use crate::adapters::db::DbAdapter;
use crate::adapters::token::TokenSigner;

#[derive(Clone)]
pub struct PasswordIdentityAdapter {
    db: Arc<DbAdapter>,
    tokens: TokenSigner,
}

impl PasswordIdentityAdapter {
    pub fn new(db: Arc<DbAdapter>, tokens: TokenSigner) -> Self {
        Self { db, tokens }
    }
}

pub fn hash_password(password: &str) -> PortResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            PortError::Unexpected("Failed to hash password".to_string())
        })
}

pub fn verify_password(password: &str, password_hash: &str) -> PortResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        PortError::Unexpected("Stored password hash is unreadable".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[async_trait]
impl IdentityProvider for PasswordIdentityAdapter {
    async fn create_account(&self, account: &NewAccount) -> PortResult<UserProfile> {
        let password_hash = hash_password(&account.password)?;
        self.db
            .insert_user(Uuid::new_v4(), &account.username, &account.email, &password_hash)
            .await
    }

    async fn authenticate(&self, email: &str, password: &str) -> PortResult<AuthenticatedUser> {
        let invalid = || PortError::Unauthorized("Invalid email or password".to_string());

        let credentials = self
            .db
            .find_credentials_by_email(email)
            .await
            .map_err(|e| match e {
                PortError::NotFound(_) => invalid(),
                other => other,
            })?;
        if !verify_password(password, &credentials.password_hash)? {
            return Err(invalid());
        }

        let id_token = self
            .tokens
            .issue_id_token(credentials.uid, Utc::now())
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(AuthenticatedUser {
            id_token,
            uid: credentials.uid,
            email: credentials.email,
            display_name: credentials.username,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("secret123").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secret123", &hash).unwrap());
        assert!(!verify_password("secret124", &hash).unwrap());
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(verify_password("secret123", "not-a-hash").is_err());
    }
}
