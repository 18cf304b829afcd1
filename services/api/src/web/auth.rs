//! services/api/src/web/auth.rs
//!
//! Account and session endpoints: registration, login, logout and the current user.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use study_guide_core::Identity;
use uuid::Uuid;

use crate::error::{ApiError, ErrorBody};
use crate::web::middleware::{clear_session_cookie, session_cookie, set_session_cookie};
use crate::web::rest::{
    ApiResponse, LoginRequest, MessageResponse, RegisterRequest, SessionDoc, UserProfileDoc,
};
use crate::web::state::AppState;

#[derive(Serialize)]
struct SessionData {
    uid: Uuid,
    username: String,
    email: String,
    expires_in: i64,
}

/// POST /users - Create a new account
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = UserProfileDoc),
        (status = 400, description = "Invalid username, email or password", body = ErrorBody),
        (status = 409, description = "Email or username already in use", body = ErrorBody)
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let profile = state.accounts.register(&body).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_data("User created successfully.", profile)),
    ))
}

/// POST /sessions - Log in and receive the session cookie
#[utoipa::path(
    post,
    path = "/api/v1/sessions",
    request_body = LoginRequest,
    responses(
        (status = 201, description = "Session created, cookie set", body = SessionDoc),
        (status = 400, description = "Missing email or password", body = ErrorBody),
        (status = 401, description = "Wrong email or password", body = ErrorBody)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let outcome = state.accounts.login(&body).await?;

    let cookie = set_session_cookie(
        &outcome.cookie.value,
        outcome.cookie.max_age_seconds,
        state.secure_cookies,
    );
    let data = SessionData {
        uid: outcome.uid,
        username: outcome.username,
        email: outcome.email,
        expires_in: outcome.cookie.max_age_seconds,
    };

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::with_data("Session created successfully.", data)),
    ))
}

/// DELETE /sessions - Log out and clear the session cookie
#[utoipa::path(
    delete,
    path = "/api/v1/sessions",
    responses(
        (status = 200, description = "Session ended", body = MessageResponse)
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    state
        .accounts
        .logout(session_cookie(&headers).as_deref())
        .await;

    (
        StatusCode::OK,
        [(header::SET_COOKIE, clear_session_cookie(state.secure_cookies))],
        Json(ApiResponse::message("Session ended successfully.")),
    )
}

/// GET /user - The authenticated user
#[utoipa::path(
    get,
    path = "/api/v1/user",
    responses(
        (status = 200, description = "Current user", body = UserProfileDoc),
        (status = 401, description = "No valid session", body = ErrorBody)
    )
)]
pub async fn current_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.accounts.current_user(&identity).await?;

    Ok(Json(ApiResponse::with_data(
        "User retrieved successfully.",
        profile,
    )))
}
