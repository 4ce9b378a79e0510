use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{PublicUser, RefreshRequest, RegisterRequest, TokenRequest, TokenResponse, UpdateMeRequest},
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::UserRepo,
        repo_types::UserChanges,
        services::{create_user, is_valid_email, normalize_email, NewUserInput},
    },
    error::ApiError,
    extract::ApiJson,
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 5;
const BAD_CREDENTIALS: &str = "Unable to authenticate with provided credentials.";

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/", post(register))
        .route("/users/token/", post(token))
        .route("/users/token/refresh/", post(refresh))
        .route("/users/me/", get(get_me).patch(update_me))
}

pub(crate) fn check_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(ApiError::bad_request(format!(
            "Ensure password has at least {MIN_PASSWORD_LEN} characters."
        )));
    }
    Ok(())
}

fn issue_pair(keys: &JwtKeys, user_id: i64) -> Result<TokenResponse, ApiError> {
    Ok(TokenResponse {
        access_token: keys.sign_access(user_id)?,
        refresh_token: keys.sign_refresh(user_id)?,
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let email = normalize_email(&payload.email);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::bad_request("Enter a valid email address."));
    }
    check_password(&payload.password)?;

    let user = create_user(
        state.store.as_ref(),
        NewUserInput::new(email, Some(payload.password.as_str())).with_name(payload.name.trim()),
    )
    .await?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn token(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = normalize_email(&payload.email);
    let user = match state.store.find_user_by_email(&email).await? {
        Some(u) if u.is_active => u,
        _ => {
            warn!(email = %email, "token request for unknown or inactive user");
            return Err(ApiError::bad_request(BAD_CREDENTIALS));
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = user.id, "token request with invalid password");
        return Err(ApiError::bad_request(BAD_CREDENTIALS));
    }

    let pair = issue_pair(&JwtKeys::from_ref(&state), user.id)?;
    state.store.record_login(user.id).await?;

    info!(user_id = user.id, "user logged in");
    Ok(Json(pair))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| ApiError::unauthorized(e.to_string()))?;

    match state.store.find_user(claims.sub).await? {
        Some(u) if u.is_active => Ok(Json(issue_pair(&keys, u.id)?)),
        _ => Err(ApiError::unauthorized("User inactive or deleted.")),
    }
}

#[instrument(skip_all)]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(user.into())
}

#[instrument(skip_all)]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<UpdateMeRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    let password_hash = match payload.password.as_deref() {
        Some(p) => {
            check_password(p)?;
            Some(hash_password(p)?)
        }
        None => None,
    };

    let updated = state
        .store
        .update_user(
            user.id,
            UserChanges {
                name: payload.name.map(|n| n.trim().to_string()),
                password_hash,
                ..Default::default()
            },
        )
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(updated.into()))
}
