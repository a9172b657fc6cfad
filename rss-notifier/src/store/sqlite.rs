use super::{DedupMode, DedupSnapshot, DedupStore};
use crate::types::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use tracing::info;

/// SQLite-backed store; each flush rewrites the table in one transaction.
pub struct SqliteDedupStore {
    pool: SqlitePool,
    snapshot: DedupSnapshot,
}

impl SqliteDedupStore {
    pub async fn open(database_url: &str, mode: DedupMode) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // One long-lived connection: `sqlite::memory:` gives each connection
        // its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS delivered (
                seq INTEGER PRIMARY KEY,
                id TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(&pool)
        .await?;

        let rows = sqlx::query("SELECT id FROM delivered ORDER BY seq")
            .fetch_all(&pool)
            .await?;
        let persisted = rows
            .into_iter()
            .map(|row| row.try_get::<String, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let snapshot = DedupSnapshot::new(mode, persisted);
        info!("Loaded {} delivered ids from {}", snapshot.len(), database_url);

        Ok(Self { pool, snapshot })
    }
}

#[async_trait]
impl DedupStore for SqliteDedupStore {
    fn backend_name(&self) -> String {
        "sqlite".to_string()
    }

    fn snapshot(&self) -> &DedupSnapshot {
        &self.snapshot
    }

    fn snapshot_mut(&mut self) -> &mut DedupSnapshot {
        &mut self.snapshot
    }

    async fn persist(&mut self, ids: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM delivered").execute(&mut *tx).await?;
        for (seq, id) in ids.iter().enumerate() {
            sqlx::query("INSERT INTO delivered (seq, id) VALUES (?, ?)")
                .bind(seq as i64)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
