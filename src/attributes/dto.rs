use serde::{Deserialize, Serialize};

use crate::attributes::repo_types::Attribute;
use crate::error::ApiError;

pub(crate) const MAX_NAME_LEN: usize = 255;

/// Wire shape of a tag or ingredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeView {
    pub id: i64,
    pub name: String,
}

impl From<Attribute> for AttributeView {
    fn from(a: Attribute) -> Self {
        Self {
            id: a.id,
            name: a.name,
        }
    }
}

/// Body of POST and PUT.
#[derive(Debug, Deserialize)]
pub struct AttributeWrite {
    pub name: String,
}

/// Body of PATCH.
#[derive(Debug, Deserialize)]
pub struct AttributePatch {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub assigned_only: Option<u8>,
}

impl ListQuery {
    pub fn assigned_only(&self) -> bool {
        self.assigned_only.unwrap_or(0) != 0
    }
}

/// Trimmed, non-empty, at most 255 characters.
pub(crate) fn clean_name(raw: &str) -> Result<String, ApiError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("name: This field may not be blank."));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "name: Ensure this field has no more than {MAX_NAME_LEN} characters."
        )));
    }
    Ok(name.to_string())
}
