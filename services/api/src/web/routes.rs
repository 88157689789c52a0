//! services/api/src/web/routes.rs
//!
//! Assembles the `/api/v1/users` routes and their authentication layers.

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

use crate::web::auth::{
    change_password_handler, login_handler, logout_handler, refresh_token_handler,
    register_handler,
};
use crate::web::middleware::{identify_viewer, require_auth};
use crate::web::rest::health_handler;
use crate::web::state::AppState;
use crate::web::users::{
    channel_profile_handler, current_user_handler, update_account_handler,
    update_avatar_handler, update_cover_image_handler, watch_history_handler,
};

/// Upload ceiling for register/avatar/cover-image bodies.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Builds the API router with its state applied.
///
/// CORS, tracing, static assets and Swagger UI are layered on by the binary.
pub fn api_router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/refresh-token", post(refresh_token_handler));

    // Routes that personalise the answer when a session is present
    let viewer_routes = Router::new()
        .route("/c/{username}", get(channel_profile_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            identify_viewer,
        ));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/logout", post(logout_handler))
        .route("/change-password", post(change_password_handler))
        .route("/current-user", get(current_user_handler))
        .route("/update-account", patch(update_account_handler))
        .route("/avatar", patch(update_avatar_handler))
        .route("/cover-image", patch(update_cover_image_handler))
        .route("/history", get(watch_history_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let users = Router::new()
        .merge(public_routes)
        .merge(viewer_routes)
        .merge(protected_routes);

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/v1/users", users)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
