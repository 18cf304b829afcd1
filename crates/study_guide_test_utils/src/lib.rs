//! Shared test utilities for study guide integration tests.
//!
//! Provides in-memory stand-ins for every external collaborator:
//! - [`InMemoryStore`]: guide store, user directory, identity provider and
//!   session service backed by plain maps.
//! - [`ScriptedCompletion`]: a completion service that replays queued outcomes
//!   and records which models were asked.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use study_guide_core::domain::SESSION_LIFETIME_DAYS;
use study_guide_core::{
    AuthenticatedUser, CompletionRequest, CompletionService, DailyStudyUnit, Guide, GuideDraft,
    GuideStatus, GuideStore, Identity, IdentityProvider, NewAccount, PortError, PortResult,
    SessionCookie, SessionService, UserDirectory, UserProfile,
};

//=========================================================================================
// In-Memory Store
//=========================================================================================

#[derive(Clone)]
struct StoredUser {
    profile: UserProfile,
    password: String,
}

#[derive(Default)]
struct StoreState {
    guides: HashMap<Uuid, Guide>,
    users: Vec<StoredUser>,
    sessions: HashMap<String, Identity>,
    offline: bool,
}

/// Thread-safe in-memory implementation of the storage, identity and session ports.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `ping` fail, as an unreachable database would.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    /// Registers a user directly, bypassing validation.
    pub fn seed_user(&self, username: &str, email: &str, password: &str) -> UserProfile {
        let profile = UserProfile {
            username: username.to_string(),
            uid: Uuid::new_v4(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        self.state.lock().unwrap().users.push(StoredUser {
            profile: profile.clone(),
            password: password.to_string(),
        });
        profile
    }

    /// Seeds a user if needed and returns a valid session cookie for them.
    pub fn sign_in(&self, username: &str) -> String {
        let existing = self
            .state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.profile.username == username)
            .map(|u| u.profile.clone());
        let profile = existing.unwrap_or_else(|| {
            self.seed_user(username, &format!("{username}@example.com"), "secret123")
        });
        let cookie = format!("session-{}", Uuid::new_v4());
        self.state
            .lock()
            .unwrap()
            .sessions
            .insert(cookie.clone(), identity_of(&profile));
        cookie
    }

    pub fn identity(&self, username: &str) -> Identity {
        let state = self.state.lock().unwrap();
        state
            .users
            .iter()
            .find(|u| u.profile.username == username)
            .map(|u| identity_of(&u.profile))
            .unwrap_or_else(|| Identity {
                username: username.to_string(),
                uid: Uuid::nil(),
                email: format!("{username}@example.com"),
            })
    }

    /// Snapshot of a stored guide, including deleted ones.
    pub fn guide(&self, id: Uuid) -> Option<Guide> {
        self.state.lock().unwrap().guides.get(&id).cloned()
    }

    pub fn guide_count(&self) -> usize {
        self.state.lock().unwrap().guides.len()
    }

    pub fn session_count(&self) -> usize {
        self.state.lock().unwrap().sessions.len()
    }
}

fn identity_of(profile: &UserProfile) -> Identity {
    Identity {
        username: profile.username.clone(),
        uid: profile.uid,
        email: profile.email.clone(),
    }
}

#[async_trait]
impl GuideStore for InMemoryStore {
    async fn insert_guide(&self, draft: GuideDraft) -> PortResult<Guide> {
        let guide = Guide::from_draft(draft, Uuid::new_v4(), Utc::now());
        self.state
            .lock()
            .unwrap()
            .guides
            .insert(guide.id, guide.clone());
        Ok(guide)
    }

    async fn get_guide(&self, id: Uuid) -> PortResult<Guide> {
        self.guide(id)
            .ok_or_else(|| PortError::NotFound(format!("Guide {} not found", id)))
    }

    async fn list_guides_by_owner(
        &self,
        owner: &str,
        only_public: bool,
    ) -> PortResult<Vec<Guide>> {
        let state = self.state.lock().unwrap();
        let mut guides: Vec<Guide> = state
            .guides
            .values()
            .filter(|g| g.owner == owner && !g.is_deleted())
            .filter(|g| !only_public || g.is_public)
            .cloned()
            .collect();
        guides.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(guides)
    }

    async fn replace_daily_study(
        &self,
        id: Uuid,
        daily_study: &[DailyStudyUnit],
        status: GuideStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        let guide = state
            .guides
            .get_mut(&id)
            .ok_or_else(|| PortError::NotFound(format!("Guide {} not found", id)))?;
        guide.daily_study = daily_study.to_vec();
        guide.status = status;
        guide.completed_at = completed_at;
        Ok(())
    }

    async fn set_status(&self, id: Uuid, status: GuideStatus) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        let guide = state
            .guides
            .get_mut(&id)
            .ok_or_else(|| PortError::NotFound(format!("Guide {} not found", id)))?;
        guide.status = status;
        Ok(())
    }

    async fn ping(&self) -> PortResult<()> {
        if self.state.lock().unwrap().offline {
            return Err(PortError::Unexpected("store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn find_user_by_username(&self, username: &str) -> PortResult<UserProfile> {
        self.state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.profile.username == username)
            .map(|u| u.profile.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", username)))
    }
}

#[async_trait]
impl IdentityProvider for InMemoryStore {
    async fn create_account(&self, account: &NewAccount) -> PortResult<UserProfile> {
        {
            let state = self.state.lock().unwrap();
            if state.users.iter().any(|u| u.profile.username == account.username) {
                return Err(PortError::Conflict("username already exists".to_string()));
            }
            if state.users.iter().any(|u| u.profile.email == account.email) {
                return Err(PortError::Conflict("email already exists".to_string()));
            }
        }
        Ok(self.seed_user(&account.username, &account.email, &account.password))
    }

    async fn authenticate(&self, email: &str, password: &str) -> PortResult<AuthenticatedUser> {
        let state = self.state.lock().unwrap();
        let user = state
            .users
            .iter()
            .find(|u| u.profile.email == email && u.password == password)
            .ok_or_else(|| PortError::Unauthorized("invalid credentials".to_string()))?;
        Ok(AuthenticatedUser {
            id_token: format!("id-{}", user.profile.uid),
            uid: user.profile.uid,
            email: user.profile.email.clone(),
            display_name: user.profile.username.clone(),
        })
    }
}

#[async_trait]
impl SessionService for InMemoryStore {
    async fn create(&self, id_token: &str) -> PortResult<SessionCookie> {
        let uid = id_token
            .strip_prefix("id-")
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or_else(|| PortError::Unauthorized("malformed id token".to_string()))?;
        let mut state = self.state.lock().unwrap();
        let profile = state
            .users
            .iter()
            .find(|u| u.profile.uid == uid)
            .map(|u| u.profile.clone())
            .ok_or_else(|| PortError::Unauthorized("unknown user".to_string()))?;
        let value = format!("session-{}", Uuid::new_v4());
        state.sessions.insert(value.clone(), identity_of(&profile));
        Ok(SessionCookie {
            value,
            max_age_seconds: SESSION_LIFETIME_DAYS * 24 * 60 * 60,
        })
    }

    async fn verify(&self, cookie: &str) -> PortResult<Identity> {
        self.state
            .lock()
            .unwrap()
            .sessions
            .get(cookie)
            .cloned()
            .ok_or_else(|| PortError::Unauthorized("unknown session".to_string()))
    }

    async fn revoke(&self, cookie: &str) -> PortResult<()> {
        self.state.lock().unwrap().sessions.remove(cookie);
        Ok(())
    }
}

//=========================================================================================
// Scripted Completion Service
//=========================================================================================

/// One queued answer of the scripted completion service.
#[derive(Debug, Clone)]
pub enum Scripted {
    Reply(Value),
    Fail(PortError),
    /// Waits before answering, to exercise timeouts.
    Delayed(Duration, Box<Scripted>),
}

/// Replays queued outcomes in order, one per call, whatever the model.
#[derive(Clone, Default)]
pub struct ScriptedCompletion {
    queue: Arc<Mutex<VecDeque<Scripted>>>,
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, outcome: Scripted) -> &Self {
        self.queue.lock().unwrap().push_back(outcome);
        self
    }

    pub fn reply(&self, value: Value) -> &Self {
        self.push(Scripted::Reply(value))
    }

    pub fn fail(&self, err: PortError) -> &Self {
        self.push(Scripted::Fail(err))
    }

    /// Models asked so far, in call order.
    pub fn models_called(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.model.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.queue.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, request: CompletionRequest) -> PortResult<Value> {
        self.calls.lock().unwrap().push(request);
        let mut next = self
            .queue
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| PortError::Unexpected("no scripted completion left".to_string()))?;
        loop {
            match next {
                Scripted::Reply(value) => return Ok(value),
                Scripted::Fail(err) => return Err(err),
                Scripted::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    next = *inner;
                }
            }
        }
    }
}

//=========================================================================================
// Fixtures
//=========================================================================================

pub const SCHEDULER_TOPIC: &str = "Explain how process schedulers balance CPU-bound workloads";

/// A valid raw creation request for a guide of `days` days.
pub fn guide_request(days: i64) -> Value {
    json!({
        "title": "Valid Guide Title",
        "topic": SCHEDULER_TOPIC,
        "knowledge": "zero",
        "focus_time": 60,
        "days": days,
    })
}

/// One generated unit for `day`, without a `completed` flag.
pub fn generated_unit(day: u32) -> Value {
    json!({
        "day": day,
        "title": format!("Scheduling fundamentals, part {}", day),
        "goal": "Understand how the run queue is ordered.",
        "theoretical_research": [
            "What is a run queue?",
            "How does preemption work?"
        ],
        "practical_activity": "Trace three processes through a round-robin scheduler by hand.",
        "learning_verification": "Why does a CPU-bound task lose priority over time?"
    })
}

/// The model output for a plan of `days` days.
pub fn generated_plan(days: u32) -> Value {
    json!({ "daily_study": (1..=days).map(generated_unit).collect::<Vec<_>>() })
}

/// A client-side unit list for `days` days with the given completion flags.
pub fn study_list(completed: &[bool]) -> Value {
    Value::Array(
        completed
            .iter()
            .enumerate()
            .map(|(index, done)| {
                let mut unit = generated_unit(index as u32 + 1);
                unit["completed"] = json!(done);
                unit
            })
            .collect(),
    )
}

pub fn relevant_verdict() -> Value {
    json!({
        "is_valid": true,
        "is_relevant": true,
        "is_bad_language": false,
        "is_gibberish": false,
        "motive": "N/A"
    })
}

pub fn irrelevant_verdict(motive: &str) -> Value {
    json!({
        "is_valid": false,
        "is_relevant": false,
        "is_bad_language": false,
        "is_gibberish": true,
        "motive": motive
    })
}

pub fn rate_limited() -> PortError {
    PortError::RateLimited("429 Too Many Requests".to_string())
}

pub fn overloaded() -> PortError {
    PortError::Overloaded("503 The model is overloaded".to_string())
}

pub fn models(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}
