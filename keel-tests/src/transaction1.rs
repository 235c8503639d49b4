use crate::silent_logs;
use futures::FutureExt;
use keel::{Connection, Db, Error, ErrorKind, Model, Value};
use std::{panic::AssertUnwindSafe, sync::LazyLock};
use tokio::sync::Mutex;

#[derive(Model, Debug, Default, Clone, PartialEq)]
#[keel(table = "tx_transfers")]
pub struct Transfer {
    pub id: i64,
    pub amount: i64,
    #[keel("unique")]
    pub reference: String,
}

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

fn transfer(reference: &str, amount: i64) -> Transfer {
    Transfer {
        reference: reference.into(),
        amount,
        ..Default::default()
    }
}

pub async fn transaction1<C: Connection>(db: &Db, connection: &mut C) {
    let _lock = MUTEX.lock().await;
    db.drop_table::<Transfer, _>(connection, true)
        .await
        .expect("Failed to drop Transfer table");
    db.create_table::<Transfer, _>(connection, false)
        .await
        .expect("Failed to create Transfer table");

    // Commit
    let id = db
        .transaction(connection, |mut scope| {
            async move {
                let db = scope.db();
                let mut first = transfer("T-1", 100);
                db.insert(scope.executor(), &mut first).await?;
                let mut second = transfer("T-2", -40);
                db.insert(scope.executor(), &mut second).await?;
                Ok::<_, Error>(first.id)
            }
            .boxed()
        })
        .await
        .expect("The transaction should commit");
    assert_ne!(id, 0);
    assert_eq!(
        db.find::<Transfer>()
            .count(connection)
            .await
            .expect("Failed to count the transfers"),
        2
    );

    // An error rolls everything back
    let error;
    silent_logs! {
        error = db
            .transaction(connection, |mut scope| {
                async move {
                    let db = scope.db();
                    let mut third = transfer("T-3", 5);
                    db.insert(scope.executor(), &mut third).await?;
                    // Duplicate reference
                    let mut again = transfer("T-1", 5);
                    db.insert(scope.executor(), &mut again).await?;
                    Ok::<_, Error>(())
                }
                .boxed()
            })
            .await
            .expect_err("The duplicate must abort the transaction");
    }
    assert!(
        matches!(ErrorKind::of(&error), Some(ErrorKind::DuplicateKey(..))),
        "{error:#}"
    );
    assert_eq!(
        db.find::<Transfer>()
            .filter(
                &format!("{} = ?", db.dialect().quoted("reference")),
                [Value::from("T-3")]
            )
            .count(connection)
            .await
            .expect("Failed to count the transfers"),
        0
    );

    // A panic rolls back and reaches the caller
    let outcome = AssertUnwindSafe(db.transaction(connection, |mut scope| {
        async move {
            let db = scope.db();
            let mut fourth = transfer("T-4", 1);
            db.insert(scope.executor(), &mut fourth).await?;
            if fourth.id != 0 {
                panic!("Interrupted transfer");
            }
            Ok::<_, Error>(())
        }
        .boxed()
    }))
    .catch_unwind()
    .await;
    let payload = outcome.expect_err("The panic must be resumed");
    assert_eq!(
        payload.downcast_ref::<&str>().copied(),
        Some("Interrupted transfer")
    );
    let references = db
        .find::<Transfer>()
        .order_by(&db.dialect().quoted("reference"))
        .all(connection)
        .await
        .expect("Failed to load the transfers")
        .into_iter()
        .map(|v| v.reference)
        .collect::<Vec<_>>();
    assert_eq!(references, ["T-1", "T-2"]);
}
