//! crates/study_guide_core/src/domain.rs
//!
//! Defines the core data structures for study guides and the people who own them.
//! Values that carry invariants are only constructed through validating
//! constructors, so an out-of-range guide request cannot be represented.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::validation;

//=========================================================================================
// Guide Inputs
//=========================================================================================

/// The learner's prior knowledge of the topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Knowledge {
    Zero,
    Beginner,
    Intermediate,
}

impl Knowledge {
    pub const ALL: [Knowledge; 3] = [Knowledge::Zero, Knowledge::Beginner, Knowledge::Intermediate];

    pub fn as_str(&self) -> &'static str {
        match self {
            Knowledge::Zero => "zero",
            Knowledge::Beginner => "beginner",
            Knowledge::Intermediate => "intermediate",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == value)
    }
}

/// A validated study request. Every field is trimmed and within range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GuideInputsRecord")]
pub struct GuideInputs {
    title: String,
    topic: String,
    knowledge: Knowledge,
    #[serde(rename = "focus_time")]
    focus_time_minutes: u32,
    days: u32,
}

/// Unchecked mirror of `GuideInputs`, used when reading persisted documents.
#[derive(Deserialize)]
struct GuideInputsRecord {
    title: String,
    topic: String,
    knowledge: Knowledge,
    focus_time: i64,
    days: i64,
}

impl TryFrom<GuideInputsRecord> for GuideInputs {
    type Error = DomainError;

    fn try_from(record: GuideInputsRecord) -> Result<Self, Self::Error> {
        GuideInputs::new(
            &record.title,
            &record.topic,
            record.knowledge,
            record.focus_time,
            record.days,
        )
    }
}

impl GuideInputs {
    /// Checks every field in the fixed order title, topic, focus time, days and
    /// fails on the first violation.
    pub fn new(
        title: &str,
        topic: &str,
        knowledge: Knowledge,
        focus_time_minutes: i64,
        days: i64,
    ) -> Result<Self, DomainError> {
        let title = validation::check_title(title)?;
        let topic = validation::check_topic(topic)?;
        let focus_time_minutes = validation::check_focus_time(focus_time_minutes)?;
        let days = validation::check_days(days)?;

        Ok(Self {
            title,
            topic,
            knowledge,
            focus_time_minutes,
            days,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn knowledge(&self) -> Knowledge {
        self.knowledge
    }

    pub fn focus_time_minutes(&self) -> u32 {
        self.focus_time_minutes
    }

    pub fn days(&self) -> u32 {
        self.days
    }
}

//=========================================================================================
// Daily Study Units
//=========================================================================================

/// One day of a study plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DailyStudyUnit {
    pub day: u32,
    pub title: String,
    pub goal: String,
    pub theoretical_research: Vec<String>,
    pub practical_activity: String,
    pub learning_verification: String,
    #[serde(default)]
    pub completed: bool,
}

/// Ways a list of units can break the plan shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanViolation {
    #[error("expected {expected} days but found {found}")]
    WrongLength { expected: usize, found: usize },
    #[error("entry {position} is numbered day {found}, expected day {expected}")]
    OutOfSequence {
        position: usize,
        expected: u32,
        found: u32,
    },
    #[error("day {day} must list between 2 and 3 research items, found {found}")]
    ResearchItems { day: u32, found: usize },
}

pub const MIN_RESEARCH_ITEMS: usize = 2;
pub const MAX_RESEARCH_ITEMS: usize = 3;

/// Checks that `units` are numbered exactly `1..=n` in order and that each day
/// lists an acceptable number of research items.
pub fn check_plan_shape(units: &[DailyStudyUnit]) -> Result<(), PlanViolation> {
    for (position, unit) in units.iter().enumerate() {
        let expected = position as u32 + 1;
        if unit.day != expected {
            return Err(PlanViolation::OutOfSequence {
                position: position + 1,
                expected,
                found: unit.day,
            });
        }
        let found = unit.theoretical_research.len();
        if !(MIN_RESEARCH_ITEMS..=MAX_RESEARCH_ITEMS).contains(&found) {
            return Err(PlanViolation::ResearchItems {
                day: unit.day,
                found,
            });
        }
    }
    Ok(())
}

/// Like `check_plan_shape`, and additionally requires exactly `days` units.
pub fn check_plan(units: &[DailyStudyUnit], days: u32) -> Result<(), PlanViolation> {
    if units.len() != days as usize {
        return Err(PlanViolation::WrongLength {
            expected: days as usize,
            found: units.len(),
        });
    }
    check_plan_shape(units)
}

//=========================================================================================
// Guide Aggregate
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuideStatus {
    Studying,
    Completed,
    Deleted,
}

impl GuideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuideStatus::Studying => "studying",
            GuideStatus::Completed => "completed",
            GuideStatus::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "studying" => Some(GuideStatus::Studying),
            "completed" => Some(GuideStatus::Completed),
            "deleted" => Some(GuideStatus::Deleted),
            _ => None,
        }
    }
}

/// A generated guide that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct GuideDraft {
    pub owner: String,
    pub inputs: GuideInputs,
    pub model: String,
    pub temperature: f64,
    pub daily_study: Vec<DailyStudyUnit>,
    pub is_public: bool,
    pub generation_time_seconds: u64,
}

/// The persisted study guide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Guide {
    pub id: Uuid,
    pub owner: String,
    pub title: String,
    pub inputs: GuideInputs,
    pub model: String,
    pub temperature: f64,
    pub daily_study: Vec<DailyStudyUnit>,
    pub status: GuideStatus,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub generation_time_seconds: u64,
}

/// Status of a guide right after its unit list was replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudyProgress {
    pub daily_study: Vec<DailyStudyUnit>,
    pub status: GuideStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Guide {
    /// Builds the persisted form of a draft. Stores call this after assigning
    /// the id and the server timestamp.
    pub fn from_draft(draft: GuideDraft, id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            owner: draft.owner,
            title: draft.inputs.title().to_string(),
            inputs: draft.inputs,
            model: draft.model,
            temperature: draft.temperature,
            daily_study: draft.daily_study,
            status: GuideStatus::Studying,
            is_public: draft.is_public,
            created_at,
            completed_at: None,
            generation_time_seconds: draft.generation_time_seconds,
        }
    }

    /// Case-sensitive exact match on the owner's username.
    pub fn is_owned_by(&self, username: &str) -> bool {
        self.owner == username
    }

    pub fn is_deleted(&self) -> bool {
        self.status == GuideStatus::Deleted
    }

    pub fn completed_days(&self) -> usize {
        self.daily_study.iter().filter(|u| u.completed).count()
    }

    /// Replaces the whole unit list and recomputes the status.
    ///
    /// The guide is `completed` exactly when every unit is completed. Any other
    /// combination puts it back to `studying` and clears `completed_at`, which is
    /// only stamped on the transition into `completed`.
    pub fn replace_daily_study(&mut self, units: Vec<DailyStudyUnit>, now: DateTime<Utc>) {
        let all_completed = !units.is_empty() && units.iter().all(|u| u.completed);
        self.daily_study = units;
        if all_completed {
            if self.status != GuideStatus::Completed || self.completed_at.is_none() {
                self.completed_at = Some(now);
            }
            self.status = GuideStatus::Completed;
        } else {
            self.status = GuideStatus::Studying;
            self.completed_at = None;
        }
    }

    pub fn progress(&self) -> StudyProgress {
        StudyProgress {
            daily_study: self.daily_study.clone(),
            status: self.status,
            completed_at: self.completed_at,
        }
    }

    pub fn summary(&self) -> GuideSummary {
        GuideSummary {
            id: self.id,
            title: self.title.clone(),
            topic: self.inputs.topic().to_string(),
            knowledge: self.inputs.knowledge(),
            days: self.inputs.days(),
            completed_days: self.completed_days(),
            status: self.status,
            is_public: self.is_public,
            created_at: self.created_at,
        }
    }
}

/// The list view of a guide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuideSummary {
    pub id: Uuid,
    pub title: String,
    pub topic: String,
    pub knowledge: Knowledge,
    pub days: u32,
    pub completed_days: usize,
    pub status: GuideStatus,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Topic Relevance
//=========================================================================================

/// The classification returned by the semantic topic check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicVerdict {
    pub is_valid: bool,
    pub is_relevant: bool,
    pub is_bad_language: bool,
    pub is_gibberish: bool,
    pub motive: String,
}

impl TopicVerdict {
    /// Recomputes `is_valid` from the three flags instead of trusting the model's verdict.
    pub fn normalized(mut self) -> Self {
        self.is_valid = self.is_relevant && !self.is_bad_language && !self.is_gibberish;
        if self.is_valid {
            self.motive = "N/A".to_string();
        }
        self
    }
}

//=========================================================================================
// Identities and Accounts
//=========================================================================================

/// The caller resolved from a session cookie. Never persisted by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub username: String,
    pub uid: Uuid,
    pub email: String,
}

/// Public account data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub username: String,
    pub uid: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A validated registration request. Contains the clear-text password, so it
/// only travels from the account service to the identity provider.
#[derive(Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// What the identity provider returns for valid credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id_token: String,
    pub uid: Uuid,
    pub email: String,
    pub display_name: String,
}

/// A signed session credential and its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub value: String,
    pub max_age_seconds: i64,
}

pub const SESSION_LIFETIME_DAYS: i64 = 14;
