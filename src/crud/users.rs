use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use super::DB;

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl DB {
    /// Returns the user with `email`, creating it first if needed.
    pub async fn upsert_user(&self, email: &str) -> Result<User> {
        let now = Utc::now();

        sqlx::query("INSERT OR IGNORE INTO users (email, created_at) VALUES (?, ?)")
            .bind(email)
            .bind(now)
            .execute(&self.pool)
            .await?;

        self.user_by_email(email)
            .await?
            .with_context(|| format!("User {email} vanished after insert"))
    }

    pub async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Replaces the user's token digest. Any previously issued token stops
    /// resolving.
    pub async fn set_token_hash(&self, user_id: i64, token_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET token_hash = ? WHERE id = ?")
            .bind(token_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn user_for_token_hash(&self, token_hash: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, created_at FROM users WHERE token_hash = ?",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}
