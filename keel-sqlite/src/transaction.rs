use crate::{
    extract::{build_query, extract_rows},
    map_error,
};
use keel_core::{Executor, Result, RowLabeled, RowsAffected, Statement, Transaction};
use sqlx::Sqlite;

/// An open sqlx transaction, rolled back by sqlx when dropped without a commit.
pub struct SqliteTransaction {
    transaction: sqlx::Transaction<'static, Sqlite>,
}

impl SqliteTransaction {
    pub(crate) fn new(transaction: sqlx::Transaction<'static, Sqlite>) -> Self {
        Self { transaction }
    }
}

impl Executor for SqliteTransaction {
    async fn fetch(&mut self, statement: &Statement) -> Result<Vec<RowLabeled>> {
        let rows = build_query(statement)
            .fetch_all(&mut *self.transaction)
            .await
            .map_err(map_error)?;
        extract_rows(rows)
    }

    async fn execute(&mut self, statement: &Statement) -> Result<RowsAffected> {
        let result = build_query(statement)
            .execute(&mut *self.transaction)
            .await
            .map_err(map_error)?;
        Ok(RowsAffected {
            rows_affected: result.rows_affected(),
            last_affected_id: Some(result.last_insert_rowid()),
        })
    }
}

impl Transaction for SqliteTransaction {
    async fn commit(self) -> Result<()> {
        self.transaction.commit().await.map_err(map_error)
    }

    async fn rollback(self) -> Result<()> {
        self.transaction.rollback().await.map_err(map_error)
    }
}
