use axum::async_trait;

use crate::auth::repo_types::{NewUser, User, UserChanges};
use crate::db::{PgStore, StoreError};

const USER_COLUMNS: &str =
    "id, email, name, password_hash, is_active, is_staff, is_superuser, last_login, created_at";

const EMAIL_TAKEN: &str = "user with this email already exists";

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn insert_user(&self, new: NewUser) -> Result<User, StoreError>;
    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// All users, ascending id.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<Option<User>, StoreError>;
    async fn record_login(&self, id: i64) -> Result<(), StoreError>;
    /// Removes the user and, by cascade, everything they own.
    async fn delete_user(&self, id: i64) -> Result<bool, StoreError>;
}

#[async_trait]
impl UserRepo for PgStore {
    async fn insert_user(&self, new: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, name, password_hash, is_active, is_staff, is_superuser)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.password_hash)
        .bind(new.is_active)
        .bind(new.is_staff)
        .bind(new.is_superuser)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::unique(e, EMAIL_TAKEN))
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET email         = COALESCE($2, email),
                   name          = COALESCE($3, name),
                   password_hash = COALESCE($4, password_hash),
                   is_active     = COALESCE($5, is_active),
                   is_staff      = COALESCE($6, is_staff),
                   is_superuser  = COALESCE($7, is_superuser)
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.email)
        .bind(changes.name)
        .bind(changes.password_hash)
        .bind(changes.is_active)
        .bind(changes.is_staff)
        .bind(changes.is_superuser)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::unique(e, EMAIL_TAKEN))
    }

    async fn record_login(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
