use crate::silent_logs;
use keel::{Connection, Db, ErrorKind, Model};
use std::sync::LazyLock;
use tokio::sync::Mutex;

#[derive(Model, Debug, Default, Clone, PartialEq)]
#[keel(table = "con_parents")]
pub struct Parent {
    pub id: i64,
    #[keel("unique;size:32")]
    pub code: String,
}

#[derive(Model, Debug, Default, Clone, PartialEq)]
#[keel(table = "con_children")]
pub struct Child {
    pub id: i64,
    #[keel("fk:con_parents.id")]
    pub parent_id: i64,
}

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn constraints<C: Connection>(db: &Db, connection: &mut C) {
    let _lock = MUTEX.lock().await;
    db.drop_table::<Child, _>(connection, true)
        .await
        .expect("Failed to drop Child table");
    db.drop_table::<Parent, _>(connection, true)
        .await
        .expect("Failed to drop Parent table");
    db.create_table::<Parent, _>(connection, false)
        .await
        .expect("Failed to create Parent table");
    db.create_table::<Child, _>(connection, false)
        .await
        .expect("Failed to create Child table");

    let mut parent = Parent {
        code: "P-1".into(),
        ..Default::default()
    };
    db.insert(connection, &mut parent)
        .await
        .expect("Failed to insert the parent");

    let mut twin = Parent {
        code: "P-1".into(),
        ..Default::default()
    };
    let duplicate;
    silent_logs! {
        duplicate = db
            .insert(connection, &mut twin)
            .await
            .expect_err("The code is unique");
    }
    assert!(
        matches!(ErrorKind::of(&duplicate), Some(ErrorKind::DuplicateKey(..))),
        "{duplicate:#}"
    );

    let mut orphan = Child {
        parent_id: parent.id + 1000,
        ..Default::default()
    };
    let violation;
    silent_logs! {
        violation = db
            .insert(connection, &mut orphan)
            .await
            .expect_err("The parent does not exist");
    }
    assert!(
        matches!(
            ErrorKind::of(&violation),
            Some(ErrorKind::ForeignKeyViolation(..))
        ),
        "{violation:#}"
    );

    let mut child = Child {
        parent_id: parent.id,
        ..Default::default()
    };
    db.insert(connection, &mut child)
        .await
        .expect("Failed to insert a child of an existing parent");
    assert_eq!(
        db.find::<Child>()
            .count(connection)
            .await
            .expect("Failed to count the children"),
        1
    );
}
