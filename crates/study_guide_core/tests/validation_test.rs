use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use study_guide_core::{Knowledge, ModelCascade, ValidationEngine};
use study_guide_test_utils::{
    guide_request, irrelevant_verdict, models, rate_limited, relevant_verdict, ScriptedCompletion,
    SCHEDULER_TOPIC,
};

fn engine(completion: &ScriptedCompletion) -> ValidationEngine {
    let cascade = ModelCascade::new(Arc::new(completion.clone()), Duration::from_secs(5));
    ValidationEngine::new(cascade, models(&["model-a", "model-b"]))
}

#[tokio::test]
async fn topic_validation_trims_and_reports_the_verdict() {
    let completion = ScriptedCompletion::new();
    completion.fail(rate_limited()).reply(relevant_verdict());

    let (topic, verdict) = engine(&completion)
        .validate_topic("   Linear algebra for machine learning   ")
        .await
        .unwrap();

    assert_eq!(topic, "Linear algebra for machine learning");
    assert!(verdict.is_valid);
    assert_eq!(verdict.motive, "N/A");
    assert_eq!(completion.models_called(), vec!["model-a", "model-b"]);
}

#[tokio::test]
async fn topic_validation_fails_with_the_motive() {
    let completion = ScriptedCompletion::new();
    completion.reply(irrelevant_verdict("asdfgh is not a subject."));

    let err = engine(&completion)
        .validate_topic("asdfgh qwerty zxcvb")
        .await
        .unwrap_err();

    assert_eq!(err.name(), "ValidationError");
    assert_eq!(err.message(), "asdfgh is not a subject.");
}

#[tokio::test]
async fn inconsistent_verdicts_are_normalized() {
    let completion = ScriptedCompletion::new();
    completion.reply(json!({
        "is_valid": true,
        "is_relevant": true,
        "is_bad_language": true,
        "is_gibberish": false,
        "motive": "Contains offensive language."
    }));

    let verdict = engine(&completion)
        .assess_topic("Some offensive topic text", None)
        .await
        .unwrap();

    assert!(!verdict.is_valid);
    assert_eq!(verdict.motive, "Contains offensive language.");
}

#[tokio::test]
async fn short_topic_fails_before_any_model_call() {
    let completion = ScriptedCompletion::new();

    let err = engine(&completion).validate_topic("short").await.unwrap_err();

    assert_eq!(err.name(), "ValidationError");
    assert!(completion.models_called().is_empty());
}

#[tokio::test]
async fn deterministic_validation_never_calls_a_model() {
    let completion = ScriptedCompletion::new();

    let inputs = engine(&completion)
        .validate(&guide_request(3), false)
        .await
        .unwrap();

    assert_eq!(inputs.title(), "Valid Guide Title");
    assert_eq!(inputs.topic(), SCHEDULER_TOPIC);
    assert_eq!(inputs.knowledge(), Knowledge::Zero);
    assert_eq!(inputs.focus_time_minutes(), 60);
    assert_eq!(inputs.days(), 3);
    assert!(completion.models_called().is_empty());
}

#[tokio::test]
async fn semantic_validation_asks_the_model_about_the_topic() {
    let completion = ScriptedCompletion::new();
    completion.reply(relevant_verdict());

    let inputs = engine(&completion)
        .validate(&guide_request(3), true)
        .await
        .unwrap();

    assert_eq!(inputs.topic(), SCHEDULER_TOPIC);
    let requests = completion.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].temperature, 0.0);
    assert!(requests[0].prompt.contains(SCHEDULER_TOPIC));
}

#[tokio::test]
async fn semantic_validation_rejects_an_irrelevant_topic() {
    let completion = ScriptedCompletion::new();
    completion.reply(irrelevant_verdict("The topic is not a field of study."));

    let err = engine(&completion)
        .validate(&guide_request(3), true)
        .await
        .unwrap_err();

    assert_eq!(err.name(), "ValidationError");
    assert_eq!(err.message(), "The topic is not a field of study.");
}

#[tokio::test]
async fn deterministic_failures_skip_the_semantic_check() {
    let completion = ScriptedCompletion::new();
    let mut request = guide_request(3);
    request["days"] = json!(0);

    let err = engine(&completion).validate(&request, true).await.unwrap_err();

    assert_eq!(err.name(), "ValidationError");
    assert!(completion.models_called().is_empty());
}
