use serde::Serialize;
use sqlx::FromRow;

/// The two per-user vocabularies attached to recipes. Both share the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Tag,
    Ingredient,
}

impl AttributeKind {
    pub fn label(self) -> &'static str {
        match self {
            AttributeKind::Tag => "tag",
            AttributeKind::Ingredient => "ingredient",
        }
    }

    /// URL segment, also the table name.
    pub fn plural(self) -> &'static str {
        match self {
            AttributeKind::Tag => "tags",
            AttributeKind::Ingredient => "ingredients",
        }
    }

    pub(crate) fn link_table(self) -> &'static str {
        match self {
            AttributeKind::Tag => "recipe_tags",
            AttributeKind::Ingredient => "recipe_ingredients",
        }
    }

    pub(crate) fn link_column(self) -> &'static str {
        match self {
            AttributeKind::Tag => "tag_id",
            AttributeKind::Ingredient => "ingredient_id",
        }
    }
}

/// A tag or an ingredient row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Attribute {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
}
