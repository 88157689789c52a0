//! services/api/src/web/extract.rs
//!
//! Request extractors whose rejections use the standard JSON envelope.

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::web::response::ApiFailure;

/// A JSON request body. Unlike `axum::Json`, a malformed body, a missing field or
/// a wrong content type is answered with a 400 envelope.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiFailure;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                debug!(status = %rejection.status(), "Rejected request body");
                Err(ApiFailure::bad_request(rejection.body_text()))
            }
        }
    }
}
