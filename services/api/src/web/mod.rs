pub mod auth;
pub mod guides;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod status;
pub mod validations;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub use middleware::require_auth;
use state::AppState;

pub const API_PREFIX: &str = "/api/v1";

/// Builds every API route under `/api/v1`. CORS and the Swagger UI are layered
/// on by the binary.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/status", get(status::status_handler))
        .route("/users", post(auth::register_handler))
        .route(
            "/sessions",
            post(auth::login_handler).delete(auth::logout_handler),
        );

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/user", get(auth::current_user_handler))
        .route("/guides", post(guides::create_guide_handler))
        .route(
            "/guides/{segment}",
            get(guides::get_guide_or_user_guides_handler)
                .patch(guides::update_studies_handler)
                .delete(guides::delete_guide_handler),
        )
        .route("/my-guides", get(guides::list_my_guides_handler))
        .route(
            "/validations/topic",
            post(validations::validate_topic_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new().nest(
        API_PREFIX,
        Router::new()
            .merge(public_routes)
            .merge(protected_routes)
            .with_state(app_state),
    )
}
