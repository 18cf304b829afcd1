//! services/api/src/adapters/completion.rs
//!
//! This module contains the adapter for structured completions. It implements the
//! `CompletionService` port against any OpenAI-compatible chat endpoint (OpenAI
//! itself, or Gemini through its OpenAI compatibility layer).

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde_json::Value;
use study_guide_core::ports::{CompletionRequest, CompletionService, PortError, PortResult};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CompletionService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiCompletionAdapter {
    client: Client<OpenAIConfig>,
}

impl OpenAiCompletionAdapter {
    /// Creates a new `OpenAiCompletionAdapter`.
    pub fn new(client: Client<OpenAIConfig>) -> Self {
        Self { client }
    }

    /// Builds a client for `api_key`, pointing at `api_base` when given.
    ///
    /// The client never retries on its own: a 429 or 5xx comes back from the first
    /// attempt so the model cascade can move on to the next candidate.
    pub fn from_credentials(api_key: &str, api_base: Option<&str>) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = api_base {
            config = config.with_api_base(base);
        }
        Self::new(Client::with_config(config).with_backoff(single_attempt()))
    }
}

/// A backoff whose retry window is already closed when the first call fails.
fn single_attempt() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

/// Sorts a provider failure into the kinds the model cascade acts on.
pub fn classify_failure(detail: String) -> PortError {
    let lowered = detail.to_lowercase();
    let rate_limited = ["429", "rate limit", "quota", "resource_exhausted", "too many requests"];
    let overloaded = ["503", "overloaded", "unavailable"];

    if rate_limited.iter().any(|marker| lowered.contains(marker)) {
        PortError::RateLimited(detail)
    } else if overloaded.iter().any(|marker| lowered.contains(marker)) {
        PortError::Overloaded(detail)
    } else {
        PortError::Unexpected(detail)
    }
}

fn classify(err: OpenAIError) -> PortError {
    classify_failure(err.to_string())
}

/// Extracts the JSON document from a message body, tolerating a Markdown fence.
fn parse_structured(content: &str) -> PortResult<Value> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(unfenced.trim())
        .map_err(|e| PortError::InvalidResponse(format!("Model output is not valid JSON: {}", e)))
}

//=========================================================================================
// `CompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CompletionService for OpenAiCompletionAdapter {
    async fn complete(&self, request: CompletionRequest) -> PortResult<Value> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system_instruction.as_str())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt.as_str())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&request.model)
            .messages(messages)
            .temperature(request.temperature as f32)
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: None,
                    name: request.schema_name.clone(),
                    schema: Some(request.schema.clone()),
                    strict: Some(true),
                },
            })
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        debug!(model = %request.model, schema = %request.schema_name, "Requesting structured completion");
        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(classify)?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::InvalidResponse("Completion response contained no text content.".to_string())
            })?;
        parse_structured(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_errors_are_rate_limits() {
        for detail in [
            "status 429: Too Many Requests",
            "RESOURCE_EXHAUSTED: You exceeded your current quota",
            "Rate limit reached for requests",
        ] {
            assert!(matches!(
                classify_failure(detail.to_string()),
                PortError::RateLimited(_)
            ));
        }
    }

    #[test]
    fn overload_errors_are_transient() {
        let err = classify_failure("503 Service Unavailable: The model is overloaded.".to_string());

        assert!(matches!(err, PortError::Overloaded(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn other_errors_are_fatal() {
        let err = classify_failure("invalid_api_key: Incorrect API key provided".to_string());

        assert!(matches!(err, PortError::Unexpected(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn client_backoff_gives_up_immediately() {
        use backoff::backoff::Backoff;

        let mut policy = single_attempt();
        std::thread::sleep(Duration::from_millis(2));

        assert_eq!(policy.next_backoff(), None);
    }

    #[test]
    fn fenced_output_is_accepted() {
        let value = parse_structured("```json\n{\"daily_study\": []}\n```").unwrap();

        assert_eq!(value["daily_study"], serde_json::json!([]));
        assert!(matches!(
            parse_structured("not json"),
            Err(PortError::InvalidResponse(_))
        ));
    }
}
