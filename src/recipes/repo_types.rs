use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::attributes::repo_types::Attribute;

pub(crate) const RECIPE_COLUMNS: &str =
    "id, user_id, title, description, time_minutes, price, link, image, created_at";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Recipe {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub image: Option<String>, // object key, not a URL
    pub created_at: OffsetDateTime,
}

/// A recipe with its linked tags and ingredients.
#[derive(Debug, Clone)]
pub struct RecipeWithLinks {
    pub recipe: Recipe,
    pub tags: Vec<Attribute>,
    pub ingredients: Vec<Attribute>,
}

/// Validated input for a new recipe. Tag and ingredient names are get-or-created for the owner.
#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub title: String,
    pub description: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
}

/// `None` keeps the current value; `Some(list)` replaces the links.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
}

/// Keeps recipes linked to any of the given ids; an empty list does not filter.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub tag_ids: Vec<i64>,
    pub ingredient_ids: Vec<i64>,
}
