//! SQLite document store — summaries and parent spans that outlive the process.
//!
//! One table, `documents(id TEXT PRIMARY KEY, content TEXT, updated_at TEXT)`,
//! created on open. Several logical stores (summaries, parents) can share a
//! database by using distinct table names.

use async_trait::async_trait;
use chrono::Utc;
use docuroute_core::error::RetrievalError;
use docuroute_core::retrieval::DocumentStore;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

const DEFAULT_TABLE: &str = "documents";

/// A SQLite-backed [`DocumentStore`].
pub struct SqliteDocumentStore {
    pool: SqlitePool,
    table: String,
}

impl SqliteDocumentStore {
    /// Open (or create) a database at `path` using the default `documents` table.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, RetrievalError> {
        let pool = Self::open_pool(path).await?;
        let store = Self::from_pool(pool, DEFAULT_TABLE).await?;
        info!("SQLite document store initialized at {path}");
        Ok(store)
    }

    /// Open a connection pool. In-memory databases get a single connection,
    /// since each connection would otherwise see its own empty database.
    pub async fn open_pool(path: &str) -> Result<SqlitePool, RetrievalError> {
        let in_memory = path.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(path)
            .map_err(|e| RetrievalError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .synchronous(SqliteSynchronous::Normal);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 4 })
            .connect_with(options)
            .await
            .map_err(|e| RetrievalError::Storage(format!("Failed to open SQLite: {e}")))
    }

    /// Use an existing pool with the given table, creating the table if needed.
    pub async fn from_pool(pool: SqlitePool, table: &str) -> Result<Self, RetrievalError> {
        if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(RetrievalError::Storage(format!("Invalid table name '{table}'")));
        }

        let store = Self {
            pool,
            table: table.to_string(),
        };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), RetrievalError> {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id          TEXT PRIMARY KEY,
                content     TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            )
            "#,
            self.table
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| RetrievalError::MigrationFailed(format!("{} table: {e}", self.table)))?;

        debug!(table = %self.table, "SQLite migrations complete");
        Ok(())
    }

    /// Insert or replace the text stored under `id`.
    pub async fn put(&self, id: &str, content: &str) -> Result<(), RetrievalError> {
        let sql = format!(
            r#"
            INSERT INTO {} (id, content, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                content = excluded.content,
                updated_at = excluded.updated_at
            "#,
            self.table
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(content)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| RetrievalError::Store {
                id: id.to_string(),
                reason: format!("INSERT failed: {e}"),
            })?;

        debug!(table = %self.table, id, "Stored document");
        Ok(())
    }

    /// Store many documents in one transaction.
    pub async fn put_many<'a>(
        &self,
        documents: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<usize, RetrievalError> {
        let sql = format!(
            r#"
            INSERT INTO {} (id, content, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                content = excluded.content,
                updated_at = excluded.updated_at
            "#,
            self.table
        );
        let now = Utc::now().to_rfc3339();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RetrievalError::Storage(format!("BEGIN failed: {e}")))?;

        let mut count = 0;
        for (id, content) in documents {
            sqlx::query(&sql)
                .bind(id)
                .bind(content)
                .bind(&now)
                .execute(&mut *tx)
                .await
                .map_err(|e| RetrievalError::Store {
                    id: id.to_string(),
                    reason: format!("INSERT failed: {e}"),
                })?;
            count += 1;
        }

        tx.commit()
            .await
            .map_err(|e| RetrievalError::Storage(format!("COMMIT failed: {e}")))?;
        Ok(count)
    }

    pub async fn count(&self) -> Result<usize, RetrievalError> {
        let sql = format!("SELECT COUNT(*) AS n FROM {}", self.table);
        let row = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RetrievalError::Storage(format!("COUNT failed: {e}")))?;
        let n: i64 = row
            .try_get("n")
            .map_err(|e| RetrievalError::Storage(format!("count column: {e}")))?;
        Ok(n as usize)
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    fn name(&self) -> &str {
        &self.table
    }

    async fn get(&self, id: &str) -> Result<Option<String>, RetrievalError> {
        let sql = format!("SELECT content FROM {} WHERE id = ?1", self.table);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RetrievalError::Store {
                id: id.to_string(),
                reason: e.to_string(),
            })?;

        row.map(|r| r.try_get::<String, _>("content"))
            .transpose()
            .map_err(|e| RetrievalError::Store {
                id: id.to_string(),
                reason: format!("content column: {e}"),
            })
    }
}
