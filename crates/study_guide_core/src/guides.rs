//! crates/study_guide_core/src/guides.rs
//!
//! The guide pipeline and the operations exposed over persisted guides.
//!
//! Creation: validation -> prompt -> generation -> store. Reads and mutations
//! load the guide, check the caller's ownership and only then touch the store.
//! `update_studies` is a plain read-modify-write: two concurrent updates of the
//! same guide race and the last writer wins.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthorizationGuard;
use crate::domain::{
    DailyStudyUnit, Guide, GuideDraft, GuideInputs, GuideStatus, GuideSummary, Identity,
    StudyProgress,
};
use crate::error::{DomainError, DomainResult};
use crate::generation::GenerationOrchestrator;
use crate::ports::{GuideStore, PortError};
use crate::prompt;
use crate::validation::{self, ValidationEngine};

pub const MAX_MODEL_NAME_CHARS: usize = 64;
pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 2.0;

/// Knobs of the creation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct GuideSettings {
    pub default_temperature: f64,
    pub semantic_validation: bool,
}

impl Default for GuideSettings {
    fn default() -> Self {
        Self {
            default_temperature: 1.0,
            semantic_validation: true,
        }
    }
}

/// Caller choices that sit next to the inputs in a creation request.
#[derive(Debug, Clone, PartialEq)]
struct GenerationOptions {
    model: Option<String>,
    temperature: f64,
    is_public: bool,
}

#[derive(Clone)]
pub struct GuideService {
    store: Arc<dyn GuideStore>,
    validation: ValidationEngine,
    orchestrator: GenerationOrchestrator,
    settings: GuideSettings,
}

impl GuideService {
    pub fn new(
        store: Arc<dyn GuideStore>,
        validation: ValidationEngine,
        orchestrator: GenerationOrchestrator,
        settings: GuideSettings,
    ) -> Self {
        Self {
            store,
            validation,
            orchestrator,
            settings,
        }
    }

    /// Validates a raw request, generates its plan and persists the guide.
    /// Nothing is stored unless every step succeeds.
    pub async fn create(&self, owner: &Identity, raw: &Value) -> DomainResult<Guide> {
        let options = self.parse_options(raw)?;
        let inputs = self
            .validation
            .validate(raw, self.settings.semantic_validation)
            .await?;

        let draft = self.generate(&owner.username, inputs, options).await?;
        self.save(draft).await
    }

    async fn generate(
        &self,
        owner: &str,
        inputs: GuideInputs,
        options: GenerationOptions,
    ) -> DomainResult<GuideDraft> {
        let prompt = prompt::build(&inputs);
        let outcome = self
            .orchestrator
            .generate(
                &prompt,
                options.model.as_deref(),
                options.temperature,
                inputs.days(),
            )
            .await?;

        Ok(GuideDraft {
            owner: owner.to_string(),
            generation_time_seconds: outcome.generation_time_seconds(),
            model: outcome.model_used,
            temperature: options.temperature,
            daily_study: outcome.units,
            is_public: options.is_public,
            inputs,
        })
    }

    fn parse_options(&self, raw: &Value) -> DomainResult<GenerationOptions> {
        let record = validation::non_empty_record(raw)?;

        let model = match validation::optional_text(record, "model")? {
            Some(model) if model.is_empty() => None,
            Some(model) if model.chars().count() > MAX_MODEL_NAME_CHARS => {
                return Err(DomainError::validation(
                    format!("The model name must have at most {} characters.", MAX_MODEL_NAME_CHARS),
                    "Send a known model name or leave it empty.",
                ))
            }
            other => other,
        };

        let temperature = match record.get("temperature") {
            None | Some(Value::Null) => self.settings.default_temperature,
            Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
            Some(_) => f64::NAN,
        };
        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
            return Err(DomainError::validation(
                format!(
                    "The temperature must be a number between {:.1} and {:.1}.",
                    MIN_TEMPERATURE, MAX_TEMPERATURE
                ),
                "Check the 'temperature' field and try again.",
            ));
        }

        let is_public = match record.get("is_public") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(_) => {
                return Err(DomainError::validation(
                    "The 'is_public' field must be true or false.",
                    "Check the request body and try again.",
                ))
            }
        };

        Ok(GenerationOptions {
            model,
            temperature,
            is_public,
        })
    }

    /// Persists a draft as a `studying` guide.
    pub async fn save(&self, draft: GuideDraft) -> DomainResult<Guide> {
        let guide = self.store.insert_guide(draft).await.map_err(|e| {
            warn!("Failed to save guide: {}", e);
            DomainError::service(
                "The guide could not be saved.",
                "Try again later.",
            )
        })?;
        info!(guide_id = %guide.id, owner = %guide.owner, model = %guide.model, "Guide created");
        Ok(guide)
    }

    /// Loads a live guide. Absent and deleted guides are both `NotFound`.
    pub async fn find_by_id(&self, id: Uuid) -> DomainResult<Guide> {
        match self.store.get_guide(id).await {
            Ok(guide) if !guide.is_deleted() => Ok(guide),
            Ok(_) | Err(PortError::NotFound(_)) => Err(guide_not_found()),
            Err(e) => Err(e.into()),
        }
    }

    /// Single-guide read for `requester`: owners always, others only for public guides.
    pub async fn read(&self, id: Uuid, requester: &Identity) -> DomainResult<Guide> {
        let guide = self.find_by_id(id).await?;
        if !guide.is_public {
            AuthorizationGuard::ensure_owner(requester, &guide)?;
        }
        Ok(guide)
    }

    pub async fn find_by_owner(
        &self,
        owner: &str,
        only_public: bool,
    ) -> DomainResult<Vec<GuideSummary>> {
        let guides = self.store.list_guides_by_owner(owner, only_public).await?;
        Ok(guides
            .iter()
            .filter(|g| !g.is_deleted())
            .map(Guide::summary)
            .collect())
    }

    /// Soft-deletes a guide owned by `requester`.
    pub async fn delete(&self, id: Uuid, requester: &Identity) -> DomainResult<()> {
        let guide = self.find_by_id(id).await?;
        AuthorizationGuard::ensure_owner(requester, &guide)?;
        self.store.set_status(id, GuideStatus::Deleted).await?;
        info!(guide_id = %id, owner = %guide.owner, "Guide deleted");
        Ok(())
    }

    /// Replaces the unit list and returns the list as persisted.
    pub async fn update_studies(
        &self,
        id: Uuid,
        new_units: &Value,
        requester: &Identity,
    ) -> DomainResult<Vec<DailyStudyUnit>> {
        self.update_progress(id, new_units, requester)
            .await
            .map(|progress| progress.daily_study)
    }

    /// `update_studies`, also reporting the recomputed status.
    ///
    /// The submitted list fully replaces the previous one; clients resend every
    /// day each time.
    pub async fn update_progress(
        &self,
        id: Uuid,
        new_units: &Value,
        requester: &Identity,
    ) -> DomainResult<StudyProgress> {
        let units = validation::parse_study_units(new_units)?;
        let mut guide = self.find_by_id(id).await?;
        AuthorizationGuard::ensure_owner(requester, &guide)?;

        if units.len() != guide.inputs.days() as usize {
            return Err(DomainError::validation(
                format!(
                    "The guide has {} days but {} daily studies were sent.",
                    guide.inputs.days(),
                    units.len()
                ),
                "Send the complete list of daily studies and try again.",
            ));
        }

        guide.replace_daily_study(units, Utc::now());
        self.store
            .replace_daily_study(id, &guide.daily_study, guide.status, guide.completed_at)
            .await?;
        info!(guide_id = %id, status = guide.status.as_str(), completed_days = guide.completed_days(), "Daily studies updated");

        let persisted = self.find_by_id(id).await?;
        Ok(persisted.progress())
    }
}

fn guide_not_found() -> DomainError {
    DomainError::not_found("Guide not found.", "Check the ID and try again.")
}
