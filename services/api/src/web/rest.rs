//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification, and the health probe.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::web::{auth, users};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::register_handler,
        auth::login_handler,
        auth::refresh_token_handler,
        auth::logout_handler,
        auth::change_password_handler,
        users::current_user_handler,
        users::update_account_handler,
        users::update_avatar_handler,
        users::update_cover_image_handler,
        users::channel_profile_handler,
        users::watch_history_handler,
    ),
    components(
        schemas(
            HealthResponse,
            auth::LoginBody,
            auth::RefreshBody,
            auth::ChangePasswordBody,
            auth::LoginResponse,
            auth::TokenPairResponse,
            auth::Empty,
            users::UserResponse,
            users::UpdateAccountRequest,
            users::ChannelProfileResponse,
            users::OwnerResponse,
            users::WatchHistoryItem,
        )
    ),
    tags(
        (name = "Identity API", description = "Registration, sessions and channel profiles. Every body is wrapped in { statusCode, data, message, success }.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Health
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    let body = HealthResponse {
        status: "ok".to_string(),
    };
    (StatusCode::OK, Json(body))
}
