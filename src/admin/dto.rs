use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::repo_types::User;

/// Row of the user list: the two columns the console shows.
#[derive(Debug, Serialize)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub name: String,
}

impl From<User> for UserRow {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Credentials {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct Permissions {
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

#[derive(Debug, Serialize)]
pub struct ImportantDates {
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
}

/// User detail grouped into the console's field sets.
#[derive(Debug, Serialize)]
pub struct UserDetail {
    pub id: i64,
    pub name: String,
    pub credentials: Credentials,
    pub permissions: Permissions,
    pub important_dates: ImportantDates,
}

impl From<User> for UserDetail {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            credentials: Credentials { email: u.email },
            permissions: Permissions {
                is_active: u.is_active,
                is_staff: u.is_staff,
                is_superuser: u.is_superuser,
            },
            important_dates: ImportantDates {
                last_login: u.last_login,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AdminCreateUser {
    pub email: String,
    pub password1: String,
    pub password2: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "active_default")]
    pub is_active: bool,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
}

fn active_default() -> bool {
    true
}

/// Editable fields. `last_login` is not listed, so a supplied value is dropped.
#[derive(Debug, Default, Deserialize)]
pub struct AdminPatchUser {
    pub email: Option<String>,
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
}
