//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: register, login, refresh-token rotation, logout
//! and password change.

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Extension,
};
use identity_core::{LoginRequest, RegisterUser, TokenPair};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;

use crate::web::cookies::{read_cookie, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::web::extract::JsonBody;
use crate::web::middleware::AuthenticatedUser;
use crate::web::multipart::read_form;
use crate::web::response::{ApiFailure, ApiResponse};
use crate::web::state::AppState;
use crate::web::users::UserResponse;
use crate::web::validation::check_email;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginBody {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshBody {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordBody {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<TokenPair> for TokenPairResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

/// Empty `data` payload for endpoints with nothing to return.
#[derive(Serialize, ToSchema)]
pub struct Empty {}

//=========================================================================================
// Cookie Helpers
//=========================================================================================

type CookieHeaders = AppendHeaders<[(header::HeaderName, String); 2]>;

fn session_cookies(state: &AppState, tokens: &TokenPair) -> CookieHeaders {
    let issuer = &state.tokens;
    AppendHeaders([
        (
            header::SET_COOKIE,
            state
                .cookies
                .session_cookie(ACCESS_COOKIE, &tokens.access_token, issuer.access_ttl()),
        ),
        (
            header::SET_COOKIE,
            state
                .cookies
                .session_cookie(REFRESH_COOKIE, &tokens.refresh_token, issuer.refresh_ttl()),
        ),
    ])
}

fn cleared_cookies(state: &AppState) -> CookieHeaders {
    AppendHeaders([
        (header::SET_COOKIE, state.cookies.cleared_cookie(ACCESS_COOKIE)),
        (header::SET_COOKIE, state.cookies.cleared_cookie(REFRESH_COOKIE)),
    ])
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/v1/users/register - Create a new user account
#[utoipa::path(
    post,
    path = "/api/v1/users/register",
    request_body(
        content_type = "multipart/form-data",
        description = "Text parts `fullName`, `email`, `username`, `password`; file parts `avatar` (required) and `coverImage`."
    ),
    responses(
        (status = 201, description = "User registered", body = UserResponse),
        (status = 400, description = "Missing field, invalid email or missing avatar"),
        (status = 409, description = "Username or email already taken")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiFailure> {
    let mut form = read_form(multipart).await?;
    let email = form.text("email");
    check_email(Some(&email)).map_err(ApiFailure::bad_request)?;

    let input = RegisterUser {
        full_name: form.text("fullName"),
        email,
        username: form.text("username"),
        password: form.text("password"),
        avatar: form.take_file("avatar"),
        cover_image: form.take_file("coverImage"),
    };
    let user = state.sessions.register(input).await?;

    Ok(ApiResponse::new(
        StatusCode::CREATED,
        UserResponse::from(user),
        "User registered successfully",
    ))
}

/// POST /api/v1/users/login - Login with username or email
#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    request_body = LoginBody,
    responses(
        (status = 200, description = "Login successful; session cookies set", body = LoginResponse),
        (status = 400, description = "Username or email is required"),
        (status = 401, description = "Invalid user credentials"),
        (status = 404, description = "User does not exist")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<LoginBody>,
) -> Result<impl IntoResponse, ApiFailure> {
    let outcome = state
        .sessions
        .login(LoginRequest {
            username: req.username,
            email: req.email,
            password: req.password,
        })
        .await?;

    let cookies = session_cookies(&state, &outcome.tokens);
    let response = LoginResponse {
        user: UserResponse::from(outcome.user),
        access_token: outcome.tokens.access_token,
        refresh_token: outcome.tokens.refresh_token,
    };
    Ok((cookies, ApiResponse::ok(response, "User logged in successfully")))
}

/// POST /api/v1/users/refresh-token - Rotate the refresh token
///
/// The token is taken from the `refreshToken` cookie, or from a JSON body
/// `{ "refreshToken": "..." }` when no cookie is present.
#[utoipa::path(
    post,
    path = "/api/v1/users/refresh-token",
    request_body(content = RefreshBody, description = "Optional when the cookie is sent."),
    responses(
        (status = 200, description = "New token pair issued; session cookies set", body = TokenPairResponse),
        (status = 401, description = "Missing, invalid, expired or already used refresh token")
    )
)]
pub async fn refresh_token_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiFailure> {
    let from_body = if body.is_empty() {
        RefreshBody::default()
    } else {
        serde_json::from_slice::<RefreshBody>(&body).unwrap_or_else(|e| {
            debug!("Ignoring unreadable refresh body: {}", e);
            RefreshBody::default()
        })
    };
    let presented = read_cookie(&headers, REFRESH_COOKIE)
        .map(str::to_string)
        .or(from_body.refresh_token);

    let tokens = state.sessions.refresh(presented.as_deref()).await?;

    let cookies = session_cookies(&state, &tokens);
    Ok((
        cookies,
        ApiResponse::ok(TokenPairResponse::from(tokens), "Access token refreshed"),
    ))
}

/// POST /api/v1/users/logout - Revoke the session and clear cookies
#[utoipa::path(
    post,
    path = "/api/v1/users/logout",
    responses(
        (status = 200, description = "Logout successful; session cookies cleared", body = Empty),
        (status = 401, description = "Missing or invalid access token")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, ApiFailure> {
    state.sessions.logout(caller.id).await?;
    Ok((
        cleared_cookies(&state),
        ApiResponse::ok(Empty {}, "User logged out successfully"),
    ))
}

/// POST /api/v1/users/change-password - Change the caller's password
#[utoipa::path(
    post,
    path = "/api/v1/users/change-password",
    request_body = ChangePasswordBody,
    responses(
        (status = 200, description = "Password changed", body = Empty),
        (status = 400, description = "New password is required"),
        (status = 401, description = "Invalid old password or access token")
    )
)]
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    JsonBody(req): JsonBody<ChangePasswordBody>,
) -> Result<impl IntoResponse, ApiFailure> {
    state
        .sessions
        .change_password(caller.id, &req.old_password, &req.new_password)
        .await?;
    Ok(ApiResponse::ok(Empty {}, "Password changed successfully"))
}
