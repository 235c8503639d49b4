#[cfg(test)]
mod tests {
    use futures::FutureExt;
    use keel_core::{
        Config, Connection, Db, Error, Executor, Result, RowLabeled, RowsAffected, Statement,
        Transaction,
    };
    use std::{
        panic::AssertUnwindSafe,
        sync::{Arc, Mutex},
    };

    /// Shared record of everything the mock backend was asked to do.
    #[derive(Default, Clone)]
    struct Journal(Arc<Mutex<Vec<String>>>);

    impl Journal {
        fn push(&self, entry: impl Into<String>) {
            self.0.lock().unwrap().push(entry.into());
        }
        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct MockConnection {
        journal: Journal,
        fail_commit: bool,
    }

    struct MockTransaction {
        journal: Journal,
        fail_commit: bool,
    }

    fn run(journal: &Journal, statement: &Statement) -> Result<RowsAffected> {
        journal.push(statement.sql.clone());
        if statement.sql.starts_with("FAIL") {
            return Err(Error::msg("Statement failed"));
        }
        Ok(RowsAffected {
            rows_affected: 1,
            last_affected_id: None,
        })
    }

    impl Executor for MockConnection {
        async fn fetch(&mut self, statement: &Statement) -> Result<Vec<RowLabeled>> {
            run(&self.journal, statement)?;
            Ok(Vec::new())
        }
        async fn execute(&mut self, statement: &Statement) -> Result<RowsAffected> {
            run(&self.journal, statement)
        }
    }

    impl Connection for MockConnection {
        type Transaction = MockTransaction;
        async fn begin(&mut self) -> Result<MockTransaction> {
            self.journal.push("BEGIN");
            Ok(MockTransaction {
                journal: self.journal.clone(),
                fail_commit: self.fail_commit,
            })
        }
    }

    impl Executor for MockTransaction {
        async fn fetch(&mut self, statement: &Statement) -> Result<Vec<RowLabeled>> {
            run(&self.journal, statement)?;
            Ok(Vec::new())
        }
        async fn execute(&mut self, statement: &Statement) -> Result<RowsAffected> {
            run(&self.journal, statement)
        }
    }

    impl Transaction for MockTransaction {
        async fn commit(self) -> Result<()> {
            self.journal.push("COMMIT");
            if self.fail_commit {
                return Err(Error::msg("Commit refused"));
            }
            Ok(())
        }
        async fn rollback(self) -> Result<()> {
            self.journal.push("ROLLBACK");
            Ok(())
        }
    }

    fn setup(fail_commit: bool) -> (Db, MockConnection, Journal) {
        let journal = Journal::default();
        let connection = MockConnection {
            journal: journal.clone(),
            fail_commit,
        };
        (Db::new(Config::default()).unwrap(), connection, journal)
    }

    #[tokio::test]
    async fn commits_on_success() {
        let (db, mut connection, journal) = setup(false);
        let result = db
            .transaction(&mut connection, |mut scope| {
                async move {
                    let db = scope.db();
                    let affected = db.execute(scope.executor(), &"INSERT 1".into()).await?;
                    db.execute(scope.executor(), &"INSERT 2".into()).await?;
                    Ok::<_, Error>(affected.rows_affected + 41)
                }
                .boxed()
            })
            .await
            .unwrap();
        assert_eq!(result, 42);
        assert_eq!(journal.entries(), ["BEGIN", "INSERT 1", "INSERT 2", "COMMIT"]);
    }

    #[tokio::test]
    async fn rolls_back_on_error() {
        let (db, mut connection, journal) = setup(false);
        let error = db
            .transaction(&mut connection, |mut scope| {
                async move {
                    let db = scope.db();
                    db.execute(scope.executor(), &"INSERT 1".into()).await?;
                    db.execute(scope.executor(), &"FAIL 2".into()).await?;
                    db.execute(scope.executor(), &"INSERT 3".into()).await?;
                    Ok::<_, Error>(())
                }
                .boxed()
            })
            .await
            .unwrap_err();
        assert!(format!("{error:#}").contains("Statement failed"));
        assert_eq!(journal.entries(), ["BEGIN", "INSERT 1", "FAIL 2", "ROLLBACK"]);
    }

    #[tokio::test]
    async fn rolls_back_on_panic_and_resumes_it() {
        let (db, mut connection, journal) = setup(false);
        let outcome = AssertUnwindSafe(db.transaction(&mut connection, |mut scope| {
            async move {
                let db = scope.db();
                db.execute(scope.executor(), &"INSERT 1".into()).await?;
                if db.config().builder_pool_size > 0 {
                    panic!("Unit of work panicked");
                }
                Ok::<_, Error>(())
            }
            .boxed()
        }))
        .catch_unwind()
        .await;
        let payload = outcome.expect_err("The panic must reach the caller");
        assert_eq!(
            payload.downcast_ref::<&str>().copied(),
            Some("Unit of work panicked")
        );
        assert_eq!(journal.entries(), ["BEGIN", "INSERT 1", "ROLLBACK"]);
    }

    #[tokio::test]
    async fn commit_failure_is_returned() {
        let (db, mut connection, journal) = setup(true);
        let error = db
            .transaction(&mut connection, |mut scope| {
                async move {
                    scope.db().execute(scope.executor(), &"INSERT 1".into()).await?;
                    Ok::<_, Error>(())
                }
                .boxed()
            })
            .await
            .unwrap_err();
        assert!(format!("{error:#}").contains("Commit refused"));
        assert_eq!(journal.entries(), ["BEGIN", "INSERT 1", "COMMIT"]);
    }
}
