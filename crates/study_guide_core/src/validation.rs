//! crates/study_guide_core/src/validation.rs
//!
//! Deterministic field checks and the semantic topic check.
//!
//! Deterministic checks run in a fixed order (title, topic, knowledge, focus
//! time, days) and stop at the first failure so the caller gets a single
//! actionable message. The semantic check only runs once all of them pass.

use std::ops::RangeInclusive;

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::domain::{DailyStudyUnit, GuideInputs, Knowledge, TopicVerdict};
use crate::error::{DomainError, DomainResult};
use crate::generation::{CascadeError, ModelCascade, EXHAUSTED_MESSAGE};
use crate::ports::CompletionRequest;
use crate::prompt;

pub const TITLE_CHARS: RangeInclusive<usize> = 10..=80;
pub const TOPIC_CHARS: RangeInclusive<usize> = 10..=150;
pub const FOCUS_TIME_MINUTES: RangeInclusive<i64> = 30..=480;
pub const DAYS: RangeInclusive<i64> = 3..=30;

//=========================================================================================
// Deterministic Field Checks
//=========================================================================================

pub fn check_title(title: &str) -> DomainResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(DomainError::validation(
            "The title must not be empty.",
            "Fill in the guide title and try again.",
        ));
    }
    if !TITLE_CHARS.contains(&title.chars().count()) {
        return Err(DomainError::validation(
            format!(
                "The title must have between {} and {} characters.",
                TITLE_CHARS.start(),
                TITLE_CHARS.end()
            ),
            "Check the number of characters in the title and try again.",
        ));
    }
    Ok(title.to_string())
}

pub fn check_topic(topic: &str) -> DomainResult<String> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(DomainError::validation(
            "The topic must not be empty.",
            "Fill in the study topic and try again.",
        ));
    }
    if !TOPIC_CHARS.contains(&topic.chars().count()) {
        return Err(DomainError::validation(
            format!(
                "The study topic must have between {} and {} characters.",
                TOPIC_CHARS.start(),
                TOPIC_CHARS.end()
            ),
            "Check the number of characters in the topic and try again.",
        ));
    }
    Ok(topic.to_string())
}

pub fn check_knowledge(knowledge: &str) -> DomainResult<Knowledge> {
    let knowledge = knowledge.trim();
    if knowledge.is_empty() {
        return Err(DomainError::validation(
            "The prior knowledge must not be empty.",
            "Fill in the prior knowledge and try again.",
        ));
    }
    Knowledge::parse(knowledge).ok_or_else(|| {
        DomainError::validation(
            "The knowledge must be 'zero', 'beginner' or 'intermediate'.",
            "Fill in the 'knowledge' field correctly and try again.",
        )
    })
}

pub fn check_focus_time(minutes: i64) -> DomainResult<u32> {
    if !FOCUS_TIME_MINUTES.contains(&minutes) {
        return Err(DomainError::validation(
            format!(
                "The focus time must be between {} and {} minutes.",
                FOCUS_TIME_MINUTES.start(),
                FOCUS_TIME_MINUTES.end()
            ),
            "Check the 'focus time' field and try again.",
        ));
    }
    Ok(minutes as u32)
}

pub fn check_days(days: i64) -> DomainResult<u32> {
    if !DAYS.contains(&days) {
        return Err(DomainError::validation(
            format!(
                "The number of days must be between {} and {}.",
                DAYS.start(),
                DAYS.end()
            ),
            "Check the 'days' field and try again.",
        ));
    }
    Ok(days as u32)
}

//=========================================================================================
// Raw Record Access
//=========================================================================================

fn text_field<'a>(
    raw: &'a Map<String, Value>,
    key: &str,
    label: &str,
) -> DomainResult<&'a str> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(""),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(DomainError::validation(
            format!("The {} must be a text.", label),
            format!("Send the {} as a text and try again.", label),
        )),
    }
}

fn integer_field(raw: &Map<String, Value>, key: &str, label: &str) -> DomainResult<i64> {
    match raw.get(key) {
        None | Some(Value::Null) => Err(DomainError::validation(
            format!("The {} must not be empty.", label),
            format!("Fill in the {} and try again.", label),
        )),
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| {
            DomainError::validation(
                format!("The {} must be a whole number.", label),
                format!("Send the {} as a whole number and try again.", label),
            )
        }),
        Some(_) => Err(DomainError::validation(
            format!("The {} must be a whole number.", label),
            format!("Send the {} as a whole number and try again.", label),
        )),
    }
}

/// Reads an optional string, rejecting any other JSON type.
pub fn optional_text(raw: &Map<String, Value>, key: &str) -> DomainResult<Option<String>> {
    match raw.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(_) => Err(DomainError::validation(
            format!("The '{}' field must be a text.", key),
            "Check the request body and try again.",
        )),
    }
}

/// Returns the record as an object, rejecting empty or non-object input first.
pub fn non_empty_record(raw: &Value) -> DomainResult<&Map<String, Value>> {
    match raw {
        Value::Object(map) if !map.is_empty() => Ok(map),
        Value::Object(_) | Value::Null => Err(DomainError::validation(
            "The inputs must not be empty.",
            "Fill in the form and try again.",
        )),
        _ => Err(DomainError::validation(
            "The inputs must be a JSON object.",
            "Check the request body and try again.",
        )),
    }
}

/// Deterministic validation of a raw guide request.
pub fn parse_guide_inputs(raw: &Value) -> DomainResult<GuideInputs> {
    let record = non_empty_record(raw)?;

    let title = check_title(text_field(record, "title", "title")?)?;
    let topic = check_topic(text_field(record, "topic", "study topic")?)?;
    let knowledge = check_knowledge(text_field(record, "knowledge", "prior knowledge")?)?;
    let focus_time = integer_field(record, "focus_time", "focus time")?;
    let days = integer_field(record, "days", "number of days")?;

    GuideInputs::new(&title, &topic, knowledge, focus_time, days)
}

/// Schema validation of a client-submitted unit list: it must be a list, every
/// item must match the unit schema, and days must run `1..=n` in order.
pub fn parse_study_units(raw: &Value) -> DomainResult<Vec<DailyStudyUnit>> {
    let items = raw.as_array().ok_or_else(|| {
        DomainError::validation(
            "The 'new_studies_list' field must be a list of daily studies.",
            "Send the complete list of daily studies and try again.",
        )
    })?;

    let units = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<DailyStudyUnit>(item.clone()).map_err(|e| {
                DomainError::validation(
                    format!("Daily study at position {} is invalid: {}.", index + 1, e),
                    "Send every daily study with all of its fields and try again.",
                )
            })
        })
        .collect::<DomainResult<Vec<_>>>()?;

    crate::domain::check_plan_shape(&units).map_err(|e| {
        DomainError::validation(
            format!("The daily studies are invalid: {}.", e),
            "Do not reorder or renumber the days and try again.",
        )
    })?;
    Ok(units)
}

//=========================================================================================
// The Validation Engine
//=========================================================================================

/// Runs the deterministic checks and, on request, the semantic topic check
/// against an ordered list of candidate models.
#[derive(Clone)]
pub struct ValidationEngine {
    cascade: ModelCascade,
    models: Vec<String>,
}

impl ValidationEngine {
    pub fn new(cascade: ModelCascade, models: Vec<String>) -> Self {
        Self { cascade, models }
    }

    /// Validates a raw guide request; `semantic` additionally checks topic relevance.
    pub async fn validate(&self, raw: &Value, semantic: bool) -> DomainResult<GuideInputs> {
        let inputs = parse_guide_inputs(raw)?;
        if semantic {
            self.ensure_relevant(inputs.topic(), Some(inputs.knowledge()))
                .await?;
        }
        Ok(inputs)
    }

    /// Trims and checks a lone topic, then asks the models whether it is a real
    /// subject of study.
    pub async fn validate_topic(&self, raw_topic: &str) -> DomainResult<(String, TopicVerdict)> {
        let topic = check_topic(raw_topic)?;
        let verdict = self.ensure_relevant(&topic, None).await?;
        Ok((topic, verdict))
    }

    /// Fails with the model-supplied motive when the verdict is negative.
    pub async fn ensure_relevant(
        &self,
        topic: &str,
        knowledge: Option<Knowledge>,
    ) -> DomainResult<TopicVerdict> {
        let verdict = self.assess_topic(topic, knowledge).await?;
        if !verdict.is_valid {
            info!(topic = %topic, "Topic rejected by semantic validation");
            let motive = if verdict.motive.trim().is_empty() || verdict.motive == "N/A" {
                "The topic is not a valid subject of study.".to_string()
            } else {
                verdict.motive.clone()
            };
            return Err(DomainError::validation(
                motive,
                "Describe a specific subject you want to study and try again.",
            ));
        }
        Ok(verdict)
    }

    /// Returns the normalized verdict without judging it.
    pub async fn assess_topic(
        &self,
        topic: &str,
        knowledge: Option<Knowledge>,
    ) -> DomainResult<TopicVerdict> {
        let request = CompletionRequest {
            model: String::new(),
            system_instruction: prompt::VALIDATION_INSTRUCTION.to_string(),
            prompt: prompt::build_topic_check(topic, knowledge),
            schema_name: prompt::TOPIC_VERDICT_SCHEMA_NAME.to_string(),
            schema: prompt::topic_verdict_schema(),
            temperature: 0.0,
        };

        let completed = self
            .cascade
            .run(&self.models, &request)
            .await
            .map_err(|err| match err {
                CascadeError::Exhausted { .. } => {
                    DomainError::service(EXHAUSTED_MESSAGE, "Try again in a few minutes.")
                }
                CascadeError::Fatal { .. } => DomainError::service(
                    "The topic could not be validated.",
                    "Try again later.",
                ),
            })?;

        let verdict: TopicVerdict = serde_json::from_value(completed.value).map_err(|e| {
            warn!(model = %completed.model, "Unreadable topic verdict: {}", e);
            DomainError::service("The topic could not be validated.", "Try again later.")
        })?;
        Ok(verdict.normalized())
    }
}
