use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::{debug, warn};

use crate::{auth::repo, error::ApiError, state::AppState};

/// Header carrying the session token for People and Tables.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Resolves `X-Auth-Token` to the owning user id.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub i64);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTH_TOKEN_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                debug!("missing X-Auth-Token header");
                ApiError::unauthorized("unauthorized")
            })?;

        let user_id = repo::find_session_user_id(&state.db, token)
            .await?
            .ok_or_else(|| {
                warn!("unknown or expired session token");
                ApiError::unauthorized("unauthorized")
            })?;

        Ok(AuthUser(user_id))
    }
}
