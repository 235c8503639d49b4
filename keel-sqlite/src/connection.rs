use crate::{
    SqliteTransaction,
    extract::{build_query, extract_rows},
    map_error,
};
use keel_core::{
    Connection, Context, ErrorKind, Executor, Result, RowLabeled, RowsAffected, Statement,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// Sqlite database reached through a single pooled sqlx connection.
///
/// One connection keeps `sqlite::memory:` databases alive and shared between statements.
#[derive(Debug, Clone)]
pub struct SqliteConnection {
    pool: SqlitePool,
}

impl SqliteConnection {
    /// Opens the database at `url`, for example `sqlite::memory:` or `sqlite://data.db`.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| ErrorKind::ConnectionFailed(format!("Invalid url `{url}`: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(map_error)
            .with_context(|| format!("While connecting to `{url}`"))?;
        log::debug!("Connected to `{url}`");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

impl Executor for SqliteConnection {
    async fn fetch(&mut self, statement: &Statement) -> Result<Vec<RowLabeled>> {
        let rows = build_query(statement)
            .fetch_all(&self.pool)
            .await
            .map_err(map_error)?;
        extract_rows(rows)
    }

    async fn execute(&mut self, statement: &Statement) -> Result<RowsAffected> {
        let result = build_query(statement)
            .execute(&self.pool)
            .await
            .map_err(map_error)?;
        Ok(RowsAffected {
            rows_affected: result.rows_affected(),
            last_affected_id: Some(result.last_insert_rowid()),
        })
    }
}

impl Connection for SqliteConnection {
    type Transaction = SqliteTransaction;

    async fn begin(&mut self) -> Result<SqliteTransaction> {
        let transaction = self.pool.begin().await.map_err(map_error)?;
        Ok(SqliteTransaction::new(transaction))
    }
}
