use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;
use uuid::Uuid;

use crate::auth::errors::AuthError;
use crate::state::AppState;

/// Extracts and validates the bearer token, returning the account ID.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Read Authorization header
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                (StatusCode::UNAUTHORIZED, "missing Authorization header").into_response()
            })?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| (StatusCode::UNAUTHORIZED, "invalid auth scheme").into_response())?;

        match state.accounts.tokens().parse(token) {
            Ok(id) => Ok(AuthUser(id)),
            Err(e @ AuthError::Token(_)) => {
                warn!("invalid or expired token");
                Err(e.into_response())
            }
            Err(e) => Err(e.into_response()),
        }
    }
}
