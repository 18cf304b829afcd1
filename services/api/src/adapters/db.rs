//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of the
//! `GuideStore` and `UserDirectory` ports from the `core` crate. It also keeps the
//! credential and session rows used by the identity and session adapters. All
//! interactions with PostgreSQL go through `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use study_guide_core::domain::{
    DailyStudyUnit, Guide, GuideDraft, GuideInputs, GuideStatus, Identity, UserProfile,
};
use study_guide_core::ports::{GuideStore, PortError, PortResult, UserDirectory};
use uuid::Uuid;

const GUIDE_COLUMNS: &str = "id, owner, title, inputs, model, temperature, daily_study, status, \
     is_public, created_at, completed_at, generation_time_seconds";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the storage ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct GuideRecord {
    id: Uuid,
    owner: String,
    title: String,
    inputs: Json<GuideInputs>,
    model: String,
    temperature: f64,
    daily_study: Json<Vec<DailyStudyUnit>>,
    status: String,
    is_public: bool,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    generation_time_seconds: i64,
}
impl GuideRecord {
    fn to_domain(self) -> PortResult<Guide> {
        let status = GuideStatus::parse(&self.status).ok_or_else(|| {
            PortError::Unexpected(format!("Guide {} has unknown status '{}'", self.id, self.status))
        })?;
        Ok(Guide {
            id: self.id,
            owner: self.owner,
            title: self.title,
            inputs: self.inputs.0,
            model: self.model,
            temperature: self.temperature,
            daily_study: self.daily_study.0,
            status,
            is_public: self.is_public,
            created_at: self.created_at,
            completed_at: self.completed_at,
            generation_time_seconds: self.generation_time_seconds.max(0) as u64,
        })
    }
}

#[derive(FromRow)]
struct UserRecord {
    uid: Uuid,
    username: String,
    email: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> UserProfile {
        UserProfile {
            username: self.username,
            uid: self.uid,
            email: self.email,
            created_at: self.created_at,
        }
    }
}

/// A user row together with its password hash.
#[derive(FromRow)]
pub struct CredentialRecord {
    pub uid: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(FromRow)]
struct SessionIdentityRecord {
    uid: Uuid,
    username: String,
    email: String,
}

//=========================================================================================
// `GuideStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl GuideStore for DbAdapter {
    async fn insert_guide(&self, draft: GuideDraft) -> PortResult<Guide> {
        let query = format!(
            "INSERT INTO guides (id, owner, title, inputs, model, temperature, daily_study, is_public, generation_time_seconds) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {GUIDE_COLUMNS}"
        );
        let record = sqlx::query_as::<_, GuideRecord>(&query)
            .bind(Uuid::new_v4())
            .bind(&draft.owner)
            .bind(draft.inputs.title())
            .bind(Json(&draft.inputs))
            .bind(&draft.model)
            .bind(draft.temperature)
            .bind(Json(&draft.daily_study))
            .bind(draft.is_public)
            .bind(draft.generation_time_seconds as i64)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        record.to_domain()
    }

    async fn get_guide(&self, id: Uuid) -> PortResult<Guide> {
        let query = format!("SELECT {GUIDE_COLUMNS} FROM guides WHERE id = $1");
        let record = sqlx::query_as::<_, GuideRecord>(&query)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => PortError::NotFound(format!("Guide {} not found", id)),
                _ => unexpected(e),
            })?;
        record.to_domain()
    }

    async fn list_guides_by_owner(&self, owner: &str, only_public: bool) -> PortResult<Vec<Guide>> {
        let query = format!(
            "SELECT {GUIDE_COLUMNS} FROM guides \
             WHERE owner = $1 AND status <> 'deleted' AND ($2 = FALSE OR is_public) \
             ORDER BY created_at DESC"
        );
        let records = sqlx::query_as::<_, GuideRecord>(&query)
            .bind(owner)
            .bind(only_public)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn replace_daily_study(
        &self,
        id: Uuid,
        daily_study: &[DailyStudyUnit],
        status: GuideStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE guides SET daily_study = $1, status = $2, completed_at = $3 WHERE id = $4",
        )
        .bind(Json(daily_study))
        .bind(status.as_str())
        .bind(completed_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Guide {} not found", id)));
        }
        Ok(())
    }

    async fn set_status(&self, id: Uuid, status: GuideStatus) -> PortResult<()> {
        let result = sqlx::query("UPDATE guides SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Guide {} not found", id)));
        }
        Ok(())
    }

    async fn ping(&self) -> PortResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// `UserDirectory` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserDirectory for DbAdapter {
    async fn find_user_by_username(&self, username: &str) -> PortResult<UserProfile> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT uid, username, email, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", username)),
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }
}

//=========================================================================================
// Credentials and Sessions
//=========================================================================================

impl DbAdapter {
    /// Inserts a user row. A duplicate username or email is a `Conflict` naming the field.
    pub async fn insert_user(
        &self,
        uid: Uuid,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> PortResult<UserProfile> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (uid, username, email, password_hash) VALUES ($1, $2, $3, $4) \
             RETURNING uid, username, email, created_at",
        )
        .bind(uid)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                let field = match db.constraint() {
                    Some("users_email_key") => "email",
                    _ => "username",
                };
                PortError::Conflict(format!("{} already exists", field))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    pub async fn find_credentials_by_email(&self, email: &str) -> PortResult<CredentialRecord> {
        sqlx::query_as::<_, CredentialRecord>(
            "SELECT uid, username, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound("No user with this email".to_string()),
            _ => unexpected(e),
        })
    }

    pub async fn user_exists(&self, uid: Uuid) -> PortResult<bool> {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT uid FROM users WHERE uid = $1")
            .bind(uid)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(row.is_some())
    }

    pub async fn create_auth_session(
        &self,
        session_id: Uuid,
        uid: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, uid, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(uid)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    /// The owner of a session that is neither expired nor revoked.
    pub async fn find_session_identity(
        &self,
        session_id: Uuid,
        now: DateTime<Utc>,
    ) -> PortResult<Identity> {
        let record = sqlx::query_as::<_, SessionIdentityRecord>(
            "SELECT u.uid, u.username, u.email FROM auth_sessions s \
             JOIN users u ON u.uid = s.uid \
             WHERE s.id = $1 AND s.revoked_at IS NULL AND s.expires_at > $2",
        )
        .bind(session_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Session {} not found or expired", session_id))
            }
            _ => unexpected(e),
        })?;
        Ok(Identity {
            username: record.username,
            uid: record.uid,
            email: record.email,
        })
    }

    pub async fn revoke_auth_session(&self, session_id: Uuid) -> PortResult<()> {
        sqlx::query(
            "UPDATE auth_sessions SET revoked_at = NOW() WHERE id = $1 AND revoked_at IS NULL",
        )
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }
}
