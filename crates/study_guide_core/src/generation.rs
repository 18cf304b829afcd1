//! crates/study_guide_core/src/generation.rs
//!
//! Model selection and fallback for structured completions, and the guide
//! generation built on top of it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::domain::{check_plan, DailyStudyUnit};
use crate::error::{DomainError, DomainResult};
use crate::ports::{CompletionRequest, CompletionService, PortError};
use crate::prompt;

pub const EXHAUSTED_MESSAGE: &str =
    "The content could not be generated: quota exceeded or access denied on every model.";

//=========================================================================================
// Model Cascade
//=========================================================================================

/// Result of a single call against one model.
#[derive(Debug)]
enum Attempt {
    Succeeded(Value),
    /// Rate limited or overloaded; the next candidate may be tried.
    Transient(PortError),
    Fatal(PortError),
}

/// A successful structured completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Completed {
    pub value: Value,
    pub model: String,
    /// Wall-clock time of the successful call only.
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CascadeError {
    #[error("every candidate model was rate limited or overloaded")]
    Exhausted { last: Option<PortError> },
    #[error("model {model} failed: {source}")]
    Fatal { model: String, source: PortError },
}

/// Tries candidate models strictly one after another, bounding each call by a
/// fixed timeout. Only rate-limit and overload failures move on to the next
/// candidate; everything else stops the cascade.
#[derive(Clone)]
pub struct ModelCascade {
    completion: Arc<dyn CompletionService>,
    timeout: Duration,
}

impl ModelCascade {
    pub fn new(completion: Arc<dyn CompletionService>, timeout: Duration) -> Self {
        Self {
            completion,
            timeout,
        }
    }

    async fn attempt(&self, request: CompletionRequest) -> Attempt {
        match tokio::time::timeout(self.timeout, self.completion.complete(request)).await {
            Err(_) => Attempt::Fatal(PortError::Timeout(self.timeout)),
            Ok(Ok(value)) => Attempt::Succeeded(value),
            Ok(Err(err)) if err.is_transient() => Attempt::Transient(err),
            Ok(Err(err)) => Attempt::Fatal(err),
        }
    }

    /// Runs `request` against each of `models` in order until one succeeds.
    pub async fn run(
        &self,
        models: &[String],
        request: &CompletionRequest,
    ) -> Result<Completed, CascadeError> {
        let mut last = None;
        for (index, model) in models.iter().enumerate() {
            let started = Instant::now();
            match self.attempt(request.with_model(model)).await {
                Attempt::Succeeded(value) => {
                    let elapsed = started.elapsed();
                    info!(model = %model, attempt = index + 1, elapsed_ms = elapsed.as_millis() as u64, "Completion succeeded");
                    return Ok(Completed {
                        value,
                        model: model.clone(),
                        elapsed,
                    });
                }
                Attempt::Transient(err) => {
                    warn!(model = %model, attempt = index + 1, "Model unavailable, trying next candidate: {}", err);
                    last = Some(err);
                }
                Attempt::Fatal(err) => {
                    warn!(model = %model, attempt = index + 1, "Completion failed: {}", err);
                    return Err(CascadeError::Fatal {
                        model: model.clone(),
                        source: err,
                    });
                }
            }
        }
        Err(CascadeError::Exhausted { last })
    }
}

//=========================================================================================
// Guide Generation
//=========================================================================================

/// The generated plan and how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub units: Vec<DailyStudyUnit>,
    pub model_used: String,
    pub elapsed: Duration,
}

impl GenerationOutcome {
    pub fn generation_time_seconds(&self) -> u64 {
        self.elapsed.as_secs()
    }
}

#[derive(Deserialize)]
struct GeneratedPlan {
    daily_study: Vec<DailyStudyUnit>,
}

#[derive(Clone)]
pub struct GenerationOrchestrator {
    cascade: ModelCascade,
    fallback_models: Vec<String>,
}

impl GenerationOrchestrator {
    pub fn new(cascade: ModelCascade, fallback_models: Vec<String>) -> Self {
        Self {
            cascade,
            fallback_models,
        }
    }

    /// Generates a plan of exactly `days` units.
    ///
    /// With `model` set, that model is called once and any failure is final.
    /// Without it, the fallback list is walked in order.
    pub async fn generate(
        &self,
        prompt: &str,
        model: Option<&str>,
        temperature: f64,
        days: u32,
    ) -> DomainResult<GenerationOutcome> {
        let request = CompletionRequest {
            model: String::new(),
            system_instruction: prompt::GENERATION_INSTRUCTION.to_string(),
            prompt: prompt.to_string(),
            schema_name: prompt::DAILY_STUDY_SCHEMA_NAME.to_string(),
            schema: prompt::daily_study_schema(),
            temperature,
        };

        let completed = match model {
            Some(pinned) => self
                .cascade
                .run(&[pinned.to_string()], &request)
                .await
                .map_err(|err| {
                    warn!(model = %pinned, "Pinned model failed: {}", err);
                    DomainError::service(
                        format!("The model '{}' could not generate the guide.", pinned),
                        "Try again later or let the service pick a model.",
                    )
                })?,
            None => self
                .cascade
                .run(&self.fallback_models, &request)
                .await
                .map_err(generation_failure)?,
        };

        let units = parse_plan(completed.value, days)?;
        Ok(GenerationOutcome {
            units,
            model_used: completed.model,
            elapsed: completed.elapsed,
        })
    }
}

fn generation_failure(err: CascadeError) -> DomainError {
    match err {
        CascadeError::Exhausted { .. } => {
            DomainError::service(EXHAUSTED_MESSAGE, "Try again in a few minutes.")
        }
        CascadeError::Fatal { .. } => DomainError::service(
            "An error happened while generating the guide.",
            "Try again later.",
        ),
    }
}

/// Decodes the model output and enforces the plan contract. Nothing is
/// truncated or padded: a plan of the wrong shape is a provider failure.
fn parse_plan(value: Value, days: u32) -> DomainResult<Vec<DailyStudyUnit>> {
    let contract_violation = |detail: String| {
        warn!("Generated plan violates the contract: {}", detail);
        DomainError::service(
            "The generated guide did not match the requested plan.",
            "Try generating the guide again.",
        )
    };

    let plan: GeneratedPlan =
        serde_json::from_value(value).map_err(|e| contract_violation(e.to_string()))?;
    let mut units = plan.daily_study;
    for unit in &mut units {
        unit.completed = false;
    }
    check_plan(&units, days).map_err(|e| contract_violation(e.to_string()))?;
    Ok(units)
}
