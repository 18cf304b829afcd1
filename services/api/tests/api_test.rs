use std::sync::Arc;
use std::time::Duration;

use api_lib::web::build_router;
use api_lib::web::state::{AppPorts, AppState, ServiceSettings};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use study_guide_core::{GuideSettings, GuideStatus};
use study_guide_test_utils::{
    generated_plan, guide_request, irrelevant_verdict, models, rate_limited, relevant_verdict,
    study_list, InMemoryStore, ScriptedCompletion,
};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct TestApp {
    store: InMemoryStore,
    completion: ScriptedCompletion,
    router: Router,
}

fn test_app(semantic_validation: bool) -> TestApp {
    let store = InMemoryStore::new();
    let completion = ScriptedCompletion::new();
    let shared = Arc::new(store.clone());
    let ports = AppPorts {
        store: shared.clone(),
        users: shared.clone(),
        identity: shared.clone(),
        sessions: shared,
        completion: Arc::new(completion.clone()),
    };
    let settings = ServiceSettings {
        generation_models: models(&["model-a", "model-b"]),
        validation_models: models(&["model-a", "model-b"]),
        completion_timeout: Duration::from_secs(5),
        guide: GuideSettings {
            default_temperature: 1.0,
            semantic_validation,
        },
        secure_cookies: false,
    };
    let router = build_router(Arc::new(AppState::new(ports, settings)));
    TestApp {
        store,
        completion,
        router,
    }
}

impl TestApp {
    async fn send(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, format!("session_id={cookie}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        self.router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    /// Creates a guide for `cookie` and returns its id.
    async fn create_guide(&self, cookie: &str, request: Value) -> String {
        let days = request["days"].as_u64().unwrap() as u32;
        self.completion.reply(generated_plan(days));
        let response = self
            .send(Method::POST, "/api/v1/guides", Some(cookie), Some(request))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["data"]["id"]
            .as_str()
            .unwrap()
            .to_string()
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn assert_error_body(body: &Value, name: &str, code: u16) {
    assert_eq!(body["name"], name);
    assert_eq!(body["code"], code);
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    assert!(body["action"].as_str().is_some_and(|a| !a.is_empty()));
}

// ---------------------------------------------------------------------------
// Guides
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_guide_without_session_is_unauthorized() {
    let app = test_app(false);

    let response = app
        .send(Method::POST, "/api/v1/guides", None, Some(guide_request(3)))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_error_body(&body_json(response).await, "UnauthorizedError", 401);
    assert!(app.completion.models_called().is_empty());
}

#[tokio::test]
async fn forged_session_is_unauthorized() {
    let app = test_app(false);

    let response = app
        .send(Method::GET, "/api/v1/my-guides", Some("forged"), None)
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_guide_returns_the_persisted_guide() {
    let app = test_app(true);
    let cookie = app.store.sign_in("ana");
    app.completion
        .reply(relevant_verdict())
        .reply(generated_plan(3));

    let response = app
        .send(Method::POST, "/api/v1/guides", Some(&cookie), Some(guide_request(3)))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let guide = &body["data"];
    assert_eq!(guide["daily_study"].as_array().unwrap().len(), 3);
    assert_eq!(guide["status"], "studying");
    assert_eq!(guide["is_public"], false);
    assert_eq!(guide["owner"], "ana");
    assert_eq!(guide["inputs"]["focus_time"], 60);
    assert_eq!(guide["daily_study"][0]["completed"], false);
    assert!(body["message"].is_string());
    assert_eq!(app.store.guide_count(), 1);
}

#[tokio::test]
async fn invalid_inputs_are_a_validation_error() {
    let app = test_app(false);
    let cookie = app.store.sign_in("ana");
    let mut request = guide_request(3);
    request["title"] = json!("short");

    let response = app
        .send(Method::POST, "/api/v1/guides", Some(&cookie), Some(request))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_error_body(&body_json(response).await, "ValidationError", 400);
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let app = test_app(false);
    let cookie = app.store.sign_in("ana");
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/guides")
        .header(header::COOKIE, format!("session_id={cookie}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_error_body(&body_json(response).await, "ValidationError", 400);
}

#[tokio::test]
async fn exhausted_models_are_service_unavailable() {
    let app = test_app(false);
    let cookie = app.store.sign_in("ana");
    app.completion.fail(rate_limited()).fail(rate_limited());

    let response = app
        .send(Method::POST, "/api/v1/guides", Some(&cookie), Some(guide_request(3)))
        .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_error_body(&body_json(response).await, "ServiceError", 503);
    assert_eq!(app.store.guide_count(), 0);
}

#[tokio::test]
async fn patch_with_every_day_completed_completes_the_guide() {
    let app = test_app(false);
    let cookie = app.store.sign_in("ana");
    let id = app.create_guide(&cookie, guide_request(3)).await;

    let response = app
        .send(
            Method::PATCH,
            &format!("/api/v1/guides/{id}"),
            Some(&cookie),
            Some(json!({ "new_studies_list": study_list(&[true, true, true]) })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let stored = app.store.guide(id.parse().unwrap()).unwrap();
    assert_eq!(stored.status, GuideStatus::Completed);
    assert!(stored.completed_at.is_some());

    let fetched = body_json(
        app.send(Method::GET, &format!("/api/v1/guides/{id}"), Some(&cookie), None)
            .await,
    )
    .await;
    assert_eq!(fetched["data"]["status"], "completed");
}

#[tokio::test]
async fn patch_without_a_list_is_a_validation_error() {
    let app = test_app(false);
    let cookie = app.store.sign_in("ana");
    let id = app.create_guide(&cookie, guide_request(3)).await;

    let response = app
        .send(
            Method::PATCH,
            &format!("/api/v1/guides/{id}"),
            Some(&cookie),
            Some(json!({ "something_else": [] })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_owner_delete_is_forbidden_and_leaves_the_guide() {
    let app = test_app(false);
    let owner = app.store.sign_in("ana");
    let intruder = app.store.sign_in("bruno");
    let id = app.create_guide(&owner, guide_request(3)).await;

    let response = app
        .send(Method::DELETE, &format!("/api/v1/guides/{id}"), Some(&intruder), None)
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_error_body(&body_json(response).await, "ForbiddenError", 403);

    let response = app
        .send(Method::GET, &format!("/api/v1/guides/{id}"), Some(&owner), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn owner_delete_hides_the_guide() {
    let app = test_app(false);
    let cookie = app.store.sign_in("ana");
    let id = app.create_guide(&cookie, guide_request(3)).await;

    let response = app
        .send(Method::DELETE, &format!("/api/v1/guides/{id}"), Some(&cookie), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(Method::GET, &format!("/api/v1/guides/{id}"), Some(&cookie), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_error_body(&body_json(response).await, "NotFoundError", 404);

    let mine = body_json(
        app.send(Method::GET, "/api/v1/my-guides", Some(&cookie), None)
            .await,
    )
    .await;
    assert_eq!(mine["data"], json!([]));
}

#[tokio::test]
async fn unparseable_guide_id_is_not_found() {
    let app = test_app(false);
    let cookie = app.store.sign_in("ana");

    let response = app
        .send(Method::DELETE, "/api/v1/guides/not-a-uuid", Some(&cookie), None)
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn username_segment_lists_public_guides() {
    let app = test_app(false);
    let ana = app.store.sign_in("ana");
    let bruno = app.store.sign_in("bruno");
    app.create_guide(&ana, guide_request(3)).await;
    let mut public = guide_request(4);
    public["is_public"] = json!(true);
    let public_id = app.create_guide(&ana, public).await;

    let response = app
        .send(Method::GET, "/api/v1/guides/ana", Some(&bruno), None)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let summaries = body["data"].as_array().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0]["id"], public_id.as_str());
    assert_eq!(summaries[0]["days"], 4);
}

#[tokio::test]
async fn username_segment_checks_the_username() {
    let app = test_app(false);
    let cookie = app.store.sign_in("ana");

    let unknown = app
        .send(Method::GET, "/api/v1/guides/nobody", Some(&cookie), None)
        .await;
    let malformed = app
        .send(Method::GET, "/api/v1/guides/a", Some(&cookie), None)
        .await;

    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn my_guides_lists_only_the_callers_guides() {
    let app = test_app(false);
    let ana = app.store.sign_in("ana");
    let bruno = app.store.sign_in("bruno");
    app.create_guide(&ana, guide_request(3)).await;
    app.create_guide(&bruno, guide_request(5)).await;

    let body = body_json(
        app.send(Method::GET, "/api/v1/my-guides", Some(&ana), None)
            .await,
    )
    .await;

    let summaries = body["data"].as_array().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0]["days"], 3);
    assert_eq!(summaries[0]["completed_days"], 0);
    assert_eq!(summaries[0]["knowledge"], "zero");
}

// ---------------------------------------------------------------------------
// Topic validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn valid_topic_returns_the_verdict() {
    let app = test_app(false);
    let cookie = app.store.sign_in("ana");
    app.completion.reply(relevant_verdict());

    let response = app
        .send(
            Method::POST,
            "/api/v1/validations/topic",
            Some(&cookie),
            Some(json!({ "topic": "  Distributed consensus algorithms  " })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["topic"], "Distributed consensus algorithms");
    assert_eq!(body["data"]["info"]["is_valid"], true);
    assert_eq!(body["data"]["info"]["motive"], "N/A");
}

#[tokio::test]
async fn irrelevant_topic_is_a_validation_error() {
    let app = test_app(false);
    let cookie = app.store.sign_in("ana");
    app.completion.reply(irrelevant_verdict("This is not a subject."));

    let response = app
        .send(
            Method::POST,
            "/api/v1/validations/topic",
            Some(&cookie),
            Some(json!({ "topic": "qwertyuiop asdfgh" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_error_body(&body, "ValidationError", 400);
    assert_eq!(body["message"], "This is not a subject.");
}

// ---------------------------------------------------------------------------
// Accounts and sessions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_login_and_logout() {
    let app = test_app(false);

    let response = app
        .send(
            Method::POST,
            "/api/v1/users",
            None,
            Some(json!({ "username": "ana", "email": "ana@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["data"]["username"], "ana");

    let response = app
        .send(
            Method::POST,
            "/api/v1/sessions",
            None,
            Some(json!({ "email": "ana@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Max-Age=1209600"));
    assert!(!set_cookie.contains("Secure"));
    let cookie = set_cookie
        .strip_prefix("session_id=")
        .and_then(|rest| rest.split(';').next())
        .unwrap()
        .to_string();

    let me = app.send(Method::GET, "/api/v1/user", Some(&cookie), None).await;
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(body_json(me).await["data"]["email"], "ana@example.com");

    let response = app
        .send(Method::DELETE, "/api/v1/sessions", Some(&cookie), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .contains("Max-Age=0"));

    let me = app.send(Method::GET, "/api/v1/user", Some(&cookie), None).await;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let app = test_app(false);
    app.store.seed_user("ana", "ana@example.com", "secret123");

    let response = app
        .send(
            Method::POST,
            "/api/v1/users",
            None,
            Some(json!({ "username": "another", "email": "ana@example.com", "password": "secret123" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_error_body(&body_json(response).await, "ConflictError", 409);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = test_app(false);
    app.store.seed_user("ana", "ana@example.com", "secret123");

    let response = app
        .send(
            Method::POST,
            "/api/v1/sessions",
            None,
            Some(json!({ "email": "ana@example.com", "password": "nope-nope" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn login_without_password_is_a_validation_error() {
    let app = test_app(false);

    let response = app
        .send(
            Method::POST,
            "/api/v1/sessions",
            None,
            Some(json!({ "email": "ana@example.com" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_reflects_the_store() {
    let app = test_app(false);

    let online = app.send(Method::GET, "/api/v1/status", None, None).await;
    assert_eq!(online.status(), StatusCode::OK);
    assert_eq!(body_json(online).await["data"]["status"], "online");

    app.store.set_offline(true);
    let offline = app.send(Method::GET, "/api/v1/status", None, None).await;
    assert_eq!(offline.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(offline).await["data"]["status"], "offline");
}
