use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::{claims::TokenKind, jwt::JwtKeys, repo::UserRepo, repo_types::User};
use crate::{error::ApiError, state::AppState};

/// Validates the bearer access token and loads the active user behind it.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

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
                ApiError::unauthorized("Authentication credentials were not provided.")
            })?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header"))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            ApiError::unauthorized("Invalid or expired token")
        })?;

        if claims.kind != TokenKind::Access {
            return Err(ApiError::unauthorized("Access token required"));
        }

        let user = state
            .store
            .find_user(claims.sub)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| {
                warn!(user_id = claims.sub, "token for missing or inactive user");
                ApiError::unauthorized("User inactive or deleted.")
            })?;

        Ok(AuthUser(user))
    }
}

/// [`AuthUser`] that must also carry the staff flag.
pub struct StaffUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_staff {
            warn!(user_id = user.id, "non-staff user hit admin route");
            return Err(ApiError::Forbidden(
                "You do not have permission to perform this action.".into(),
            ));
        }
        Ok(StaffUser(user))
    }
}
