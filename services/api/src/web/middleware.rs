//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes, and the session cookie helpers.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "session_id";

/// Middleware that resolves the session cookie to an `Identity`.
///
/// If valid, inserts the identity into request extensions for handlers to use.
/// If invalid or missing, answers 401 with the uniform error body.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let cookie = session_cookie(req.headers());
    let identity = state.guard.resolve(cookie.as_deref()).await?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Reads the session cookie out of every `Cookie` header.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| {
            c.trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
                .map(str::to_string)
        })
        .filter(|value| !value.is_empty())
}

pub fn set_session_cookie(value: &str, max_age_seconds: i64, secure: bool) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{}",
        SESSION_COOKIE,
        value,
        max_age_seconds,
        if secure { "; Secure" } else { "" }
    )
}

pub fn clear_session_cookie(secure: bool) -> String {
    set_session_cookie("", 0, secure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn finds_the_session_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session_id=abc.def; lang=en"),
        );

        assert_eq!(session_cookie(&headers).as_deref(), Some("abc.def"));
    }

    #[test]
    fn ignores_similarly_named_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session_idx=1; session_id="));

        assert_eq!(session_cookie(&headers), None);
    }

    #[test]
    fn secure_flag_follows_the_environment() {
        let cookie = set_session_cookie("v", 1209600, true);

        assert!(cookie.starts_with("session_id=v; HttpOnly; SameSite=Lax; Path=/; Max-Age=1209600"));
        assert!(cookie.ends_with("; Secure"));
        assert!(!clear_session_cookie(false).contains("Secure"));
        assert!(clear_session_cookie(false).contains("Max-Age=0"));
    }
}
