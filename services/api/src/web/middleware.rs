//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use identity_core::PortError;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::web::cookies::{bearer_token, read_cookie, ACCESS_COOKIE};
use crate::web::response::ApiFailure;
use crate::web::state::AppState;

/// The caller resolved from a valid access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
}

/// The caller of a route that works with or without a session.
#[derive(Debug, Clone, Copy, Default)]
pub struct Viewer(pub Option<Uuid>);

/// Middleware that validates the access token and loads the caller.
///
/// The token is read from the `accessToken` cookie, falling back to an
/// `Authorization: Bearer` header. If valid, an [`AuthenticatedUser`] is inserted
/// into the request extensions; otherwise the request is answered with 401.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    match authenticate(&state, req.headers()).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(failure) => failure.into_response(),
    }
}

/// Like [`require_auth`], but lets anonymous callers through as `Viewer(None)`.
pub async fn identify_viewer(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let has_credentials =
        read_cookie(req.headers(), ACCESS_COOKIE).is_some() || bearer_token(req.headers()).is_some();
    let viewer = if has_credentials {
        match authenticate(&state, req.headers()).await {
            Ok(user) => Viewer(Some(user.id)),
            Err(failure) => {
                debug!("Ignoring unusable credentials on public route: {}", failure.message);
                Viewer(None)
            }
        }
    } else {
        Viewer(None)
    };
    req.extensions_mut().insert(viewer);
    next.run(req).await
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthenticatedUser, ApiFailure> {
    let token = read_cookie(headers, ACCESS_COOKIE)
        .or_else(|| bearer_token(headers))
        .ok_or_else(|| ApiFailure::unauthorized("Unauthorized request"))?;

    let claims = state
        .tokens
        .verify_access_token(token)
        .map_err(|e| {
            debug!("Access token rejected: {}", e);
            ApiFailure::unauthorized("Invalid access token")
        })?;

    match state.db.find_user_by_id(claims.sub).await {
        Ok(account) => Ok(AuthenticatedUser { id: account.id }),
        Err(PortError::NotFound(_)) => Err(ApiFailure::unauthorized("Invalid access token")),
        Err(e) => {
            error!("Failed to load user for access token: {:?}", e);
            Err(ApiFailure::internal())
        }
    }
}
