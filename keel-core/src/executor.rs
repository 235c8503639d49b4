use crate::{Result, RowLabeled, RowsAffected, Statement};
use std::future::Future;

/// Anything able to run statements: a connection or an open transaction.
pub trait Executor: Send + Sized {
    /// Execute the query and return the rows.
    fn fetch(
        &mut self,
        statement: &Statement,
    ) -> impl Future<Output = Result<Vec<RowLabeled>>> + Send;

    /// Execute the query and return the total number of rows affected.
    fn execute(
        &mut self,
        statement: &Statement,
    ) -> impl Future<Output = Result<RowsAffected>> + Send;

    /// Execute the query and return its first row, if any.
    fn fetch_one(
        &mut self,
        statement: &Statement,
    ) -> impl Future<Output = Result<Option<RowLabeled>>> + Send {
        async move { Ok(self.fetch(statement).await?.into_iter().next()) }
    }
}

pub trait Connection: Executor {
    type Transaction: Transaction + 'static;

    /// Starts a transaction. Drivers may hold their only connection until it ends: do not use
    /// the caller's executor while the transaction is open.
    fn begin(&mut self) -> impl Future<Output = Result<Self::Transaction>> + Send;
}

pub trait Transaction: Executor {
    fn commit(self) -> impl Future<Output = Result<()>> + Send;
    fn rollback(self) -> impl Future<Output = Result<()>> + Send;
}
