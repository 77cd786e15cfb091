use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use std::path::Path;
use std::str::FromStr;

use tracing::info;

const MAX_CONNECTIONS: u32 = 5;

#[derive(Clone)]
pub struct DB {
    pub(super) pool: SqlitePool,
}

impl DB {
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let options = SqliteConnectOptions::from_str(&db_path.to_string_lossy())?
            .create_if_missing(true)
            .foreign_keys(true);

        info!(path = %db_path.display(), "opening database");
        Self::connect(options, MAX_CONNECTIONS).await
    }

    async fn connect(options: SqliteConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Waits for checked-out connections to be returned, then closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
impl DB {
    /// Every connection to `sqlite::memory:` is its own database, so the test
    /// pool holds exactly one that never expires.
    pub async fn new_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn test_db_connection() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("flashdeck.db");

        let db = DB::open(&db_path).await.unwrap();
        assert!(db_path.exists());
        db.close().await;

        // migrations are idempotent across reopen
        let db = DB::open(&db_path).await.unwrap();
        db.close().await;
    }
}
