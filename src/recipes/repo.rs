use axum::async_trait;
use sqlx::PgConnection;

use crate::attributes::repo::{clear_links, get_or_create, link, linked_to};
use crate::attributes::repo_types::{Attribute, AttributeKind};
use crate::db::{PgStore, StoreError};
use crate::recipes::repo_types::{
    NewRecipe, Recipe, RecipeChanges, RecipeFilter, RecipeWithLinks, RECIPE_COLUMNS,
};

#[async_trait]
pub trait RecipeRepo: Send + Sync {
    /// Owner's recipes, newest (highest id) first.
    async fn list_recipes(&self, owner: i64, filter: &RecipeFilter) -> Result<Vec<Recipe>, StoreError>;
    async fn get_recipe(&self, owner: i64, id: i64) -> Result<Option<RecipeWithLinks>, StoreError>;
    async fn create_recipe(&self, owner: i64, new: NewRecipe) -> Result<RecipeWithLinks, StoreError>;
    async fn update_recipe(
        &self,
        owner: i64,
        id: i64,
        changes: RecipeChanges,
    ) -> Result<Option<RecipeWithLinks>, StoreError>;
    async fn set_recipe_image(
        &self,
        owner: i64,
        id: i64,
        image: &str,
    ) -> Result<Option<Recipe>, StoreError>;
    /// Returns the removed row so callers can clean up its image.
    async fn delete_recipe(&self, owner: i64, id: i64) -> Result<Option<Recipe>, StoreError>;
}

/// Links `names` (deduplicated, in order) to the recipe, creating missing items for the owner.
async fn attach(
    conn: &mut PgConnection,
    kind: AttributeKind,
    owner: i64,
    recipe_id: i64,
    names: &[String],
) -> Result<(), StoreError> {
    let mut seen: Vec<&str> = Vec::with_capacity(names.len());
    for name in names {
        if seen.contains(&name.as_str()) {
            continue;
        }
        seen.push(name);
        let item: Attribute = get_or_create(conn, kind, owner, name).await?;
        link(conn, kind, recipe_id, item.id).await?;
    }
    Ok(())
}

async fn with_links(conn: &mut PgConnection, recipe: Recipe) -> Result<RecipeWithLinks, StoreError> {
    let tags = linked_to(conn, AttributeKind::Tag, recipe.id).await?;
    let ingredients = linked_to(conn, AttributeKind::Ingredient, recipe.id).await?;
    Ok(RecipeWithLinks {
        recipe,
        tags,
        ingredients,
    })
}

#[async_trait]
impl RecipeRepo for PgStore {
    async fn list_recipes(&self, owner: i64, filter: &RecipeFilter) -> Result<Vec<Recipe>, StoreError> {
        let rows = sqlx::query_as::<_, Recipe>(&format!(
            r#"
            SELECT {RECIPE_COLUMNS}
              FROM recipes r
             WHERE r.user_id = $1
               AND (cardinality($2::bigint[]) = 0 OR EXISTS (
                    SELECT 1 FROM recipe_tags rt
                     WHERE rt.recipe_id = r.id AND rt.tag_id = ANY($2)))
               AND (cardinality($3::bigint[]) = 0 OR EXISTS (
                    SELECT 1 FROM recipe_ingredients ri
                     WHERE ri.recipe_id = r.id AND ri.ingredient_id = ANY($3)))
             ORDER BY r.id DESC
            "#
        ))
        .bind(owner)
        .bind(&filter.tag_ids)
        .bind(&filter.ingredient_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_recipe(&self, owner: i64, id: i64) -> Result<Option<RecipeWithLinks>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *conn)
        .await?;

        match recipe {
            Some(r) => Ok(Some(with_links(&mut conn, r).await?)),
            None => Ok(None),
        }
    }

    async fn create_recipe(&self, owner: i64, new: NewRecipe) -> Result<RecipeWithLinks, StoreError> {
        let mut tx = self.pool.begin().await?;
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            r#"
            INSERT INTO recipes (user_id, title, description, time_minutes, price, link)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {RECIPE_COLUMNS}
            "#
        ))
        .bind(owner)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.time_minutes)
        .bind(new.price)
        .bind(&new.link)
        .fetch_one(&mut *tx)
        .await?;

        attach(&mut tx, AttributeKind::Tag, owner, recipe.id, &new.tags).await?;
        attach(&mut tx, AttributeKind::Ingredient, owner, recipe.id, &new.ingredients).await?;
        let full = with_links(&mut tx, recipe).await?;
        tx.commit().await?;
        Ok(full)
    }

    async fn update_recipe(
        &self,
        owner: i64,
        id: i64,
        changes: RecipeChanges,
    ) -> Result<Option<RecipeWithLinks>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            r#"
            UPDATE recipes
               SET title        = COALESCE($3, title),
                   description  = COALESCE($4, description),
                   time_minutes = COALESCE($5, time_minutes),
                   price        = COALESCE($6, price),
                   link         = COALESCE($7, link)
             WHERE id = $1 AND user_id = $2
            RETURNING {RECIPE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.time_minutes)
        .bind(changes.price)
        .bind(changes.link)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(recipe) = recipe else {
            return Ok(None);
        };

        if let Some(tags) = &changes.tags {
            clear_links(&mut tx, AttributeKind::Tag, recipe.id).await?;
            attach(&mut tx, AttributeKind::Tag, owner, recipe.id, tags).await?;
        }
        if let Some(ingredients) = &changes.ingredients {
            clear_links(&mut tx, AttributeKind::Ingredient, recipe.id).await?;
            attach(&mut tx, AttributeKind::Ingredient, owner, recipe.id, ingredients).await?;
        }

        let full = with_links(&mut tx, recipe).await?;
        tx.commit().await?;
        Ok(Some(full))
    }

    async fn set_recipe_image(
        &self,
        owner: i64,
        id: i64,
        image: &str,
    ) -> Result<Option<Recipe>, StoreError> {
        let row = sqlx::query_as::<_, Recipe>(&format!(
            "UPDATE recipes SET image = $3 WHERE id = $1 AND user_id = $2 RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(id)
        .bind(owner)
        .bind(image)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_recipe(&self, owner: i64, id: i64) -> Result<Option<Recipe>, StoreError> {
        let row = sqlx::query_as::<_, Recipe>(&format!(
            "DELETE FROM recipes WHERE id = $1 AND user_id = $2 RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
