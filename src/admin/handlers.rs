use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    admin::dto::{AdminCreateUser, AdminPatchUser, UserDetail, UserRow},
    auth::{
        extractors::StaffUser,
        handlers::check_password,
        repo::UserRepo,
        repo_types::UserChanges,
        services::{create_user, is_valid_email, normalize_email, NewUserInput},
    },
    error::ApiError,
    extract::{ApiJson, ApiPath},
    state::AppState,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users/", get(list_users).post(create_user_as_admin))
        .route(
            "/admin/users/:id/",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

fn clean_email(raw: &str) -> Result<String, ApiError> {
    let email = normalize_email(raw);
    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("email: Enter a valid email address."));
    }
    Ok(email)
}

#[instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
) -> Result<Json<Vec<UserRow>>, ApiError> {
    let users = state.store.list_users().await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

#[instrument(skip_all)]
pub async fn get_user(
    State(state): State<AppState>,
    StaffUser(_): StaffUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<UserDetail>, ApiError> {
    let user = state.store.find_user(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(user.into()))
}

#[instrument(skip_all)]
pub async fn create_user_as_admin(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    ApiJson(body): ApiJson<AdminCreateUser>,
) -> Result<(StatusCode, Json<UserDetail>), ApiError> {
    let email = clean_email(&body.email)?;
    if body.password1 != body.password2 {
        warn!(staff_id = staff.id, "admin create with mismatched passwords");
        return Err(ApiError::bad_request(
            "password2: The two password fields didn't match.",
        ));
    }
    check_password(&body.password1)?;

    let mut input = NewUserInput::new(email, Some(body.password1.as_str()))
        .with_name(body.name.trim());
    input.is_active = body.is_active;
    input.is_staff = body.is_staff;
    input.is_superuser = body.is_superuser;

    let user = create_user(state.store.as_ref(), input).await?;
    info!(staff_id = staff.id, user_id = user.id, "user created from admin");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<AdminPatchUser>,
) -> Result<Json<UserDetail>, ApiError> {
    let changes = UserChanges {
        email: body.email.as_deref().map(clean_email).transpose()?,
        name: body.name.map(|n| n.trim().to_string()),
        is_active: body.is_active,
        is_staff: body.is_staff,
        is_superuser: body.is_superuser,
        ..Default::default()
    };
    let user = state
        .store
        .update_user(id, changes)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(staff_id = staff.id, user_id = id, "user updated from admin");
    Ok(Json(user.into()))
}

#[instrument(skip_all)]
pub async fn delete_user(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.store.delete_user(id).await? {
        return Err(ApiError::NotFound);
    }
    info!(staff_id = staff.id, user_id = id, "user deleted from admin");
    Ok(StatusCode::NO_CONTENT)
}
