//! services/api/src/web/users.rs
//!
//! Account and channel endpoints: the current user, account details, avatar and
//! cover image replacement, channel profiles and watch history.

use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
    Extension,
};
use chrono::{DateTime, Utc};
use identity_core::{ChannelProfile, OwnerSummary, User, WatchHistoryEntry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::extract::JsonBody;
use crate::web::middleware::{AuthenticatedUser, Viewer};
use crate::web::multipart::read_form;
use crate::web::response::{ApiFailure, ApiResponse};
use crate::web::state::AppState;
use crate::web::validation::check_email;

//=========================================================================================
// Request/Response Types
//=========================================================================================

/// A user as returned to clients. Never carries the password hash or refresh token.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub watch_history: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar: user.avatar_url,
            cover_image: user.cover_image_url,
            watch_history: user.watch_history,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub subscriber_count: u64,
    pub channels_subscribed_to_count: u64,
    pub is_subscribed: bool,
}

impl From<ChannelProfile> for ChannelProfileResponse {
    fn from(profile: ChannelProfile) -> Self {
        Self {
            id: profile.id,
            username: profile.username,
            full_name: profile.full_name,
            email: profile.email,
            avatar: profile.avatar_url,
            cover_image: profile.cover_image_url,
            subscriber_count: profile.subscriber_count,
            channels_subscribed_to_count: profile.channels_subscribed_to_count,
            is_subscribed: profile.is_subscribed,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnerResponse {
    pub id: Uuid,
    pub full_name: String,
    pub username: String,
    pub avatar: String,
}

impl From<OwnerSummary> for OwnerResponse {
    fn from(owner: OwnerSummary) -> Self {
        Self {
            id: owner.id,
            full_name: owner.full_name,
            username: owner.username,
            avatar: owner.avatar_url,
        }
    }
}

/// One watched video with its publisher.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WatchHistoryItem {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub video_file: String,
    pub thumbnail: String,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub owner: Option<OwnerResponse>,
}

impl From<WatchHistoryEntry> for WatchHistoryItem {
    fn from(entry: WatchHistoryEntry) -> Self {
        let video = entry.video;
        Self {
            id: video.id,
            title: video.title,
            description: video.description,
            video_file: video.video_url,
            thumbnail: video.thumbnail_url,
            duration: video.duration_secs,
            views: video.views,
            is_published: video.is_published,
            created_at: video.created_at,
            owner: entry.owner.map(OwnerResponse::from),
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /api/v1/users/current-user - The authenticated user
#[utoipa::path(
    get,
    path = "/api/v1/users/current-user",
    responses(
        (status = 200, description = "Current user fetched", body = UserResponse),
        (status = 401, description = "Missing or invalid access token")
    )
)]
pub async fn current_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, ApiFailure> {
    let user = state.accounts.current_user(caller.id).await?;
    Ok(ApiResponse::ok(
        UserResponse::from(user),
        "Current user fetched successfully",
    ))
}

/// PATCH /api/v1/users/update-account - Change full name and/or email
#[utoipa::path(
    patch,
    path = "/api/v1/users/update-account",
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Account details updated", body = UserResponse),
        (status = 400, description = "Nothing to update or invalid email"),
        (status = 401, description = "Missing or invalid access token"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn update_account_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    JsonBody(req): JsonBody<UpdateAccountRequest>,
) -> Result<impl IntoResponse, ApiFailure> {
    check_email(req.email.as_deref()).map_err(ApiFailure::bad_request)?;
    let user = state
        .accounts
        .update_account_details(caller.id, req.full_name.as_deref(), req.email.as_deref())
        .await?;
    Ok(ApiResponse::ok(
        UserResponse::from(user),
        "Account details updated successfully",
    ))
}

/// PATCH /api/v1/users/avatar - Replace the avatar image
#[utoipa::path(
    patch,
    path = "/api/v1/users/avatar",
    request_body(content_type = "multipart/form-data", description = "An `avatar` file part."),
    responses(
        (status = 200, description = "Avatar updated", body = UserResponse),
        (status = 400, description = "Missing file or upload failed"),
        (status = 401, description = "Missing or invalid access token")
    )
)]
pub async fn update_avatar_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiFailure> {
    let mut form = read_form(multipart).await?;
    let user = state
        .accounts
        .update_avatar(caller.id, form.take_file("avatar"))
        .await?;
    Ok(ApiResponse::ok(
        UserResponse::from(user),
        "Avatar image updated successfully",
    ))
}

/// PATCH /api/v1/users/cover-image - Replace the cover image
#[utoipa::path(
    patch,
    path = "/api/v1/users/cover-image",
    request_body(content_type = "multipart/form-data", description = "A `coverImage` file part."),
    responses(
        (status = 200, description = "Cover image updated", body = UserResponse),
        (status = 400, description = "Missing file or upload failed"),
        (status = 401, description = "Missing or invalid access token")
    )
)]
pub async fn update_cover_image_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiFailure> {
    let mut form = read_form(multipart).await?;
    let user = state
        .accounts
        .update_cover_image(caller.id, form.take_file("coverImage"))
        .await?;
    Ok(ApiResponse::ok(
        UserResponse::from(user),
        "Cover image updated successfully",
    ))
}

/// GET /api/v1/users/c/{username} - A channel with its subscription counters
#[utoipa::path(
    get,
    path = "/api/v1/users/c/{username}",
    params(
        ("username" = String, Path, description = "The channel's username.")
    ),
    responses(
        (status = 200, description = "Channel profile fetched", body = ChannelProfileResponse),
        (status = 404, description = "Channel does not exist")
    )
)]
pub async fn channel_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(Viewer(viewer)): Extension<Viewer>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiFailure> {
    let profile = state.profiles.channel_profile(viewer, &username).await?;
    Ok(ApiResponse::ok(
        ChannelProfileResponse::from(profile),
        "User channel fetched successfully",
    ))
}

/// GET /api/v1/users/history - The caller's watch history
#[utoipa::path(
    get,
    path = "/api/v1/users/history",
    responses(
        (status = 200, description = "Watch history fetched", body = [WatchHistoryItem]),
        (status = 401, description = "Missing or invalid access token")
    )
)]
pub async fn watch_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, ApiFailure> {
    let entries = state.profiles.watch_history(caller.id).await?;
    let items: Vec<WatchHistoryItem> = entries.into_iter().map(WatchHistoryItem::from).collect();
    Ok(ApiResponse::ok(items, "Watch history fetched successfully"))
}
