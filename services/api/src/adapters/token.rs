//! HMAC-SHA256 signing of id tokens and session cookies.
//!
//! Id token format: `<uid>.<expires_unix>.<hmac_hex>` over `id:<uid>:<expires_unix>`.
//! Session cookie format: `<session_id>.<hmac_hex>` over `session:<session_id>`.
//! The two message prefixes keep one kind of credential from being replayed
//! as the other.

use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// How long an id token can be exchanged for a session.
pub const ID_TOKEN_LIFETIME_SECS: i64 = 300;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token format: {0}")]
    InvalidFormat(String),

    #[error("token HMAC verification failed")]
    HmacMismatch,

    #[error("token expired")]
    Expired,

    #[error("invalid signing key")]
    InvalidKey,
}

/// Signs and verifies credentials with one secret key.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
}

impl TokenSigner {
    pub fn new(secret: Vec<u8>) -> Self {
        Self { secret }
    }

    fn mac(&self, message: &str) -> Result<HmacSha256, TokenError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| TokenError::InvalidKey)?;
        mac.update(message.as_bytes());
        Ok(mac)
    }

    fn sign(&self, message: &str) -> Result<String, TokenError> {
        Ok(hex::encode(self.mac(message)?.finalize().into_bytes()))
    }

    /// Constant-time comparison through `Mac::verify_slice`.
    fn verify(&self, message: &str, hmac_hex: &str) -> Result<(), TokenError> {
        let provided = hex::decode(hmac_hex)
            .map_err(|e| TokenError::InvalidFormat(format!("invalid hex in hmac: {e}")))?;
        self.mac(message)?
            .verify_slice(&provided)
            .map_err(|_| TokenError::HmacMismatch)
    }

    pub fn issue_id_token(&self, uid: Uuid, now: DateTime<Utc>) -> Result<String, TokenError> {
        let expires = (now + Duration::seconds(ID_TOKEN_LIFETIME_SECS)).timestamp();
        let mac = self.sign(&format!("id:{uid}:{expires}"))?;
        Ok(format!("{uid}.{expires}.{mac}"))
    }

    /// Returns the user id carried by a valid, unexpired id token.
    pub fn verify_id_token(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, TokenError> {
        let mut parts = token.splitn(3, '.');
        let (Some(uid), Some(expires), Some(mac)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::InvalidFormat(
                "expected <uid>.<expires>.<hmac>".to_string(),
            ));
        };
        let uid = Uuid::parse_str(uid).map_err(|e| TokenError::InvalidFormat(e.to_string()))?;
        let expires: i64 = expires
            .parse()
            .map_err(|e: std::num::ParseIntError| TokenError::InvalidFormat(e.to_string()))?;

        self.verify(&format!("id:{uid}:{expires}"), mac)?;

        let expires_at = Utc
            .timestamp_opt(expires, 0)
            .single()
            .ok_or_else(|| TokenError::InvalidFormat("expiry out of range".to_string()))?;
        if expires_at <= now {
            return Err(TokenError::Expired);
        }
        Ok(uid)
    }

    pub fn sign_session(&self, session_id: Uuid) -> Result<String, TokenError> {
        let mac = self.sign(&format!("session:{session_id}"))?;
        Ok(format!("{session_id}.{mac}"))
    }

    /// Returns the session id of an authentic cookie value.
    pub fn open_session(&self, cookie: &str) -> Result<Uuid, TokenError> {
        let (session_id, mac) = cookie.split_once('.').ok_or_else(|| {
            TokenError::InvalidFormat("expected <session_id>.<hmac>".to_string())
        })?;
        let session_id =
            Uuid::parse_str(session_id).map_err(|e| TokenError::InvalidFormat(e.to_string()))?;
        self.verify(&format!("session:{session_id}"), mac)?;
        Ok(session_id)
    }
}
