use std::sync::Arc;

use serde_json::json;
use study_guide_core::{AccountService, AuthorizationGuard};
use study_guide_test_utils::InMemoryStore;

fn accounts(store: &InMemoryStore) -> AccountService {
    let shared = Arc::new(store.clone());
    AccountService::new(shared.clone(), shared.clone(), shared)
}

#[tokio::test]
async fn register_then_login_issues_a_working_session() {
    let store = InMemoryStore::new();
    let service = accounts(&store);
    let guard = AuthorizationGuard::new(Arc::new(store.clone()));

    let profile = service
        .register(&json!({ "username": "ana", "email": "ana@example.com", "password": "secret123" }))
        .await
        .unwrap();
    let outcome = service
        .login(&json!({ "email": "ana@example.com", "password": "secret123" }))
        .await
        .unwrap();

    assert_eq!(outcome.uid, profile.uid);
    assert_eq!(outcome.username, "ana");
    assert_eq!(outcome.cookie.max_age_seconds, 14 * 24 * 60 * 60);

    let identity = guard.resolve(Some(&outcome.cookie.value)).await.unwrap();
    assert_eq!(identity.username, "ana");
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let store = InMemoryStore::new();
    store.seed_user("ana", "ana@example.com", "secret123");
    let service = accounts(&store);

    let by_email = service
        .register(&json!({ "username": "other", "email": "ana@example.com", "password": "secret123" }))
        .await
        .unwrap_err();
    let by_username = service
        .register(&json!({ "username": "ana", "email": "new@example.com", "password": "secret123" }))
        .await
        .unwrap_err();

    assert_eq!(by_email.name(), "ConflictError");
    assert_eq!(by_email.message(), "The email is already in use.");
    assert_eq!(by_username.message(), "The username is already in use.");
}

#[tokio::test]
async fn registration_checks_username_before_password() {
    let service = accounts(&InMemoryStore::new());

    let err = service
        .register(&json!({ "username": "a", "email": "bad", "password": "123" }))
        .await
        .unwrap_err();

    assert_eq!(err.message(), "The username is not valid.");
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let store = InMemoryStore::new();
    store.seed_user("ana", "ana@example.com", "secret123");

    let err = accounts(&store)
        .login(&json!({ "email": "ana@example.com", "password": "wrong-one" }))
        .await
        .unwrap_err();

    assert_eq!(err.name(), "UnauthorizedError");
    assert_eq!(store.session_count(), 0);
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let store = InMemoryStore::new();
    let cookie = store.sign_in("ana");
    let guard = AuthorizationGuard::new(Arc::new(store.clone()));

    accounts(&store).logout(Some(&cookie)).await;

    let err = guard.resolve(Some(&cookie)).await.unwrap_err();
    assert_eq!(err.name(), "UnauthorizedError");
    // Unknown cookies are ignored.
    accounts(&store).logout(Some("session-unknown")).await;
    accounts(&store).logout(None).await;
}

#[tokio::test]
async fn missing_cookie_is_unauthorized() {
    let guard = AuthorizationGuard::new(Arc::new(InMemoryStore::new()));

    let missing = guard.resolve(None).await.unwrap_err();
    let blank = guard.resolve(Some("  ")).await.unwrap_err();

    assert_eq!(missing.message(), "Session cookie not found.");
    assert_eq!(blank.name(), "UnauthorizedError");
}

#[tokio::test]
async fn find_user_distinguishes_malformed_and_missing_usernames() {
    let store = InMemoryStore::new();
    store.seed_user("ana", "ana@example.com", "secret123");
    let service = accounts(&store);

    assert_eq!(service.find_user("ana").await.unwrap().email, "ana@example.com");
    assert_eq!(
        service.find_user("nobody").await.unwrap_err().name(),
        "NotFoundError"
    );
    assert_eq!(
        service.find_user("no").await.unwrap_err().name(),
        "ValidationError"
    );
}
