use axum::async_trait;
use sqlx::PgConnection;

use crate::attributes::repo_types::{Attribute, AttributeKind};
use crate::db::{PgStore, StoreError};

#[async_trait]
pub trait AttributeRepo: Send + Sync {
    /// Owner's items, by name descending. `assigned_only` keeps items linked to a recipe.
    async fn list_attributes(
        &self,
        kind: AttributeKind,
        owner: i64,
        assigned_only: bool,
    ) -> Result<Vec<Attribute>, StoreError>;
    async fn get_attribute(
        &self,
        kind: AttributeKind,
        owner: i64,
        id: i64,
    ) -> Result<Option<Attribute>, StoreError>;
    async fn create_attribute(
        &self,
        kind: AttributeKind,
        owner: i64,
        name: &str,
    ) -> Result<Attribute, StoreError>;
    async fn rename_attribute(
        &self,
        kind: AttributeKind,
        owner: i64,
        id: i64,
        name: &str,
    ) -> Result<Option<Attribute>, StoreError>;
    async fn delete_attribute(
        &self,
        kind: AttributeKind,
        owner: i64,
        id: i64,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
impl AttributeRepo for PgStore {
    async fn list_attributes(
        &self,
        kind: AttributeKind,
        owner: i64,
        assigned_only: bool,
    ) -> Result<Vec<Attribute>, StoreError> {
        let sql = format!(
            r#"
            SELECT a.id, a.user_id, a.name
              FROM {table} a
             WHERE a.user_id = $1
               AND ($2 = FALSE OR EXISTS (
                    SELECT 1 FROM {links} l WHERE l.{col} = a.id
               ))
             ORDER BY a.name DESC, a.id DESC
            "#,
            table = kind.plural(),
            links = kind.link_table(),
            col = kind.link_column(),
        );
        let rows = sqlx::query_as::<_, Attribute>(&sql)
            .bind(owner)
            .bind(assigned_only)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_attribute(
        &self,
        kind: AttributeKind,
        owner: i64,
        id: i64,
    ) -> Result<Option<Attribute>, StoreError> {
        let sql = format!(
            "SELECT id, user_id, name FROM {} WHERE id = $1 AND user_id = $2",
            kind.plural()
        );
        let row = sqlx::query_as::<_, Attribute>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create_attribute(
        &self,
        kind: AttributeKind,
        owner: i64,
        name: &str,
    ) -> Result<Attribute, StoreError> {
        let sql = format!(
            "INSERT INTO {} (user_id, name) VALUES ($1, $2) RETURNING id, user_id, name",
            kind.plural()
        );
        let row = sqlx::query_as::<_, Attribute>(&sql)
            .bind(owner)
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn rename_attribute(
        &self,
        kind: AttributeKind,
        owner: i64,
        id: i64,
        name: &str,
    ) -> Result<Option<Attribute>, StoreError> {
        let sql = format!(
            "UPDATE {} SET name = $3 WHERE id = $1 AND user_id = $2 RETURNING id, user_id, name",
            kind.plural()
        );
        let row = sqlx::query_as::<_, Attribute>(&sql)
            .bind(id)
            .bind(owner)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_attribute(
        &self,
        kind: AttributeKind,
        owner: i64,
        id: i64,
    ) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1 AND user_id = $2", kind.plural());
        let res = sqlx::query(&sql)
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

// ---- recipe link helpers, used inside recipe transactions ----

/// Returns the owner's item with this exact name, inserting it when missing.
pub(crate) async fn get_or_create(
    conn: &mut PgConnection,
    kind: AttributeKind,
    owner: i64,
    name: &str,
) -> Result<Attribute, StoreError> {
    let select = format!(
        "SELECT id, user_id, name FROM {} WHERE user_id = $1 AND name = $2 ORDER BY id LIMIT 1",
        kind.plural()
    );
    if let Some(found) = sqlx::query_as::<_, Attribute>(&select)
        .bind(owner)
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?
    {
        return Ok(found);
    }

    let insert = format!(
        "INSERT INTO {} (user_id, name) VALUES ($1, $2) RETURNING id, user_id, name",
        kind.plural()
    );
    let created = sqlx::query_as::<_, Attribute>(&insert)
        .bind(owner)
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(created)
}

pub(crate) async fn link(
    conn: &mut PgConnection,
    kind: AttributeKind,
    recipe_id: i64,
    attribute_id: i64,
) -> Result<(), StoreError> {
    let sql = format!(
        "INSERT INTO {} (recipe_id, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        kind.link_table(),
        kind.link_column()
    );
    sqlx::query(&sql)
        .bind(recipe_id)
        .bind(attribute_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub(crate) async fn clear_links(
    conn: &mut PgConnection,
    kind: AttributeKind,
    recipe_id: i64,
) -> Result<(), StoreError> {
    let sql = format!("DELETE FROM {} WHERE recipe_id = $1", kind.link_table());
    sqlx::query(&sql).bind(recipe_id).execute(&mut *conn).await?;
    Ok(())
}

pub(crate) async fn linked_to(
    conn: &mut PgConnection,
    kind: AttributeKind,
    recipe_id: i64,
) -> Result<Vec<Attribute>, StoreError> {
    let sql = format!(
        r#"
        SELECT a.id, a.user_id, a.name
          FROM {table} a
          JOIN {links} l ON l.{col} = a.id
         WHERE l.recipe_id = $1
         ORDER BY a.id
        "#,
        table = kind.plural(),
        links = kind.link_table(),
        col = kind.link_column(),
    );
    let rows = sqlx::query_as::<_, Attribute>(&sql)
        .bind(recipe_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows)
}
