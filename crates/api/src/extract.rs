//! Request extractors.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use roster_core::types::SessionId;

use crate::error::AppError;

/// Header carrying the caller's session id.
pub const SESSION_HEADER: &str = "x-session-id";

/// Caller session, taken from the `x-session-id` header (a UUID).
///
/// Previews are scoped to this id. Authentication is out of scope, so the
/// header is trusted as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session(pub SessionId);

impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::BadRequest(format!("Missing {SESSION_HEADER} header")))?;

        raw.trim()
            .parse()
            .map(Session)
            .map_err(|_| AppError::BadRequest(format!("{SESSION_HEADER} must be a UUID")))
    }
}
