//! Account and caretaker queries.

use super::models::User;
use super::{DatabaseError, Db};

impl Db {
    /// Registers the account, or refreshes its chat id if it already exists.
    /// New accounts start with `default_offset_minutes`.
    pub async fn upsert_user(
        &self,
        user_id: i64,
        chat_id: i64,
        default_offset_minutes: i32,
    ) -> Result<User, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, chat_id, utc_offset_minutes, created_at)
             VALUES ($1, $2, $3, NOW())
             ON CONFLICT (id) DO UPDATE SET chat_id = EXCLUDED.chat_id
             RETURNING id, chat_id, utc_offset_minutes, created_at",
        )
        .bind(user_id)
        .bind(chat_id)
        .bind(default_offset_minutes)
        .fetch_one(self.pool())
        .await?;

        Ok(user)
    }

    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, chat_id, utc_offset_minutes, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, chat_id, utc_offset_minutes, created_at FROM users ORDER BY id",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(users)
    }

    pub async fn set_utc_offset(
        &self,
        user_id: i64,
        offset_minutes: i32,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE users SET utc_offset_minutes = $1 WHERE id = $2")
            .bind(offset_minutes)
            .bind(user_id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("user {}", user_id)));
        }
        Ok(())
    }

    pub async fn caretaker_email(&self, user_id: i64) -> Result<Option<String>, DatabaseError> {
        let email = sqlx::query_scalar::<_, String>(
            "SELECT email FROM caretakers WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(email)
    }

    /// Stores the caretaker email, replacing any previous one. `None` removes it.
    pub async fn save_caretaker_email(
        &self,
        user_id: i64,
        email: Option<&str>,
    ) -> Result<(), DatabaseError> {
        match email {
            Some(email) => {
                sqlx::query(
                    "INSERT INTO caretakers (user_id, email) VALUES ($1, $2)
                     ON CONFLICT (user_id) DO UPDATE SET email = EXCLUDED.email",
                )
                .bind(user_id)
                .bind(email)
                .execute(self.pool())
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM caretakers WHERE user_id = $1")
                    .bind(user_id)
                    .execute(self.pool())
                    .await?;
            }
        }

        Ok(())
    }
}
