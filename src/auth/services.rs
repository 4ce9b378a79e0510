use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

use crate::auth::password::{hash_password, unusable_password};
use crate::auth::repo::UserRepo;
use crate::auth::repo_types::{NewUser, User, UserChanges};
use crate::db::StoreError;
use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User must have an email address.")]
    EmptyEmail,

    #[error("password hashing failed: {0}")]
    Hash(anyhow::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<UserError> for ApiError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::EmptyEmail => ApiError::bad_request(e.to_string()),
            UserError::Hash(e) => ApiError::Internal(e),
            UserError::Store(e) => e.into(),
        }
    }
}

/// Input for [`create_user`]. `password: None` creates an account that cannot log in.
#[derive(Debug, Clone)]
pub struct NewUserInput {
    pub email: String,
    pub password: Option<String>,
    pub name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl NewUserInput {
    pub fn new(email: impl Into<String>, password: Option<&str>) -> Self {
        Self {
            email: email.into(),
            password: password.map(str::to_string),
            name: String::new(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trims the address and lower-cases the domain part; the local part is kept as typed.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Validates, hashes and persists a new user.
pub async fn create_user<R>(repo: &R, input: NewUserInput) -> Result<User, UserError>
where
    R: UserRepo + ?Sized,
{
    if input.email.trim().is_empty() {
        return Err(UserError::EmptyEmail);
    }

    let password_hash = match input.password.as_deref() {
        Some(plain) => hash_password(plain).map_err(UserError::Hash)?,
        None => unusable_password(),
    };

    let user = repo
        .insert_user(NewUser {
            email: normalize_email(&input.email),
            name: input.name,
            password_hash,
            is_active: input.is_active,
            is_staff: input.is_staff,
            is_superuser: input.is_superuser,
        })
        .await?;

    debug!(user_id = user.id, "user created");
    Ok(user)
}

pub async fn create_superuser<R>(repo: &R, email: &str, password: &str) -> Result<User, UserError>
where
    R: UserRepo + ?Sized,
{
    let user = create_user(repo, NewUserInput::new(email, Some(password))).await?;
    let user = repo
        .update_user(
            user.id,
            UserChanges {
                is_staff: Some(true),
                is_superuser: Some(true),
                ..Default::default()
            },
        )
        .await?
        .ok_or(StoreError::NotFound)?;

    info!(user_id = user.id, "superuser created");
    Ok(user)
}
