use crate::{Connection, Context, Db, Result, Transaction};
use futures::{FutureExt, future::BoxFuture};
use std::panic::{self, AssertUnwindSafe};

/// What a unit of work sees: the db and the open transaction to run statements on.
pub struct Scope<'t, T> {
    db: &'t Db,
    transaction: &'t mut T,
}

impl<'t, T: Transaction> Scope<'t, T> {
    pub fn db(&self) -> &'t Db {
        self.db
    }

    pub fn executor(&mut self) -> &mut T {
        self.transaction
    }
}

impl Db {
    /// Runs `work` inside a transaction on `connection`.
    ///
    /// Commits when `work` succeeds. Rolls back when it fails, returning its error, or when it
    /// panics, resuming the panic afterwards.
    pub async fn transaction<C, R, F>(&self, connection: &mut C, work: F) -> Result<R>
    where
        C: Connection,
        F: for<'t> FnOnce(Scope<'t, C::Transaction>) -> BoxFuture<'t, Result<R>>,
    {
        let mut transaction = connection
            .begin()
            .await
            .context("While beginning a transaction")?;
        log::debug!("Transaction started");
        let outcome = AssertUnwindSafe(work(Scope {
            db: self,
            transaction: &mut transaction,
        }))
        .catch_unwind()
        .await;
        match outcome {
            Ok(Ok(value)) => {
                transaction
                    .commit()
                    .await
                    .context("While committing the transaction")?;
                log::debug!("Transaction committed");
                Ok(value)
            }
            Ok(Err(error)) => {
                log::debug!("Transaction rolled back: {error:#}");
                if let Err(rollback) = transaction.rollback().await {
                    log::error!("Failed to roll back the transaction: {rollback:#}");
                }
                Err(error)
            }
            Err(payload) => {
                log::debug!("Transaction rolled back after a panic");
                if let Err(rollback) = transaction.rollback().await {
                    log::error!("Failed to roll back the transaction: {rollback:#}");
                }
                panic::resume_unwind(payload)
            }
        }
    }
}
