use keel::{Connection, Db, Model, Value};
use std::sync::LazyLock;
use tokio::sync::Mutex;

#[derive(Model, Debug, Default, Clone, PartialEq)]
#[keel(table = "schema_notes")]
pub struct Note {
    pub id: i64,
    pub text: String,
}

/// Second revision of [`Note`], with a column the first table lacks.
#[derive(Model, Debug, Default, Clone, PartialEq)]
#[keel(table = "schema_notes")]
pub struct NoteV2 {
    pub id: i64,
    pub text: String,
    #[keel("default:0")]
    pub pinned: bool,
}

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn schema<C: Connection>(db: &Db, connection: &mut C) {
    let _lock = MUTEX.lock().await;
    db.drop_table::<Note, _>(connection, true)
        .await
        .expect("Failed to drop Note table");
    assert!(
        !db.table_exists(connection, "schema_notes")
            .await
            .expect("Failed to check the table"),
    );
    db.create_table::<Note, _>(connection, false)
        .await
        .expect("Failed to create Note table");
    assert!(
        db.table_exists(connection, "schema_notes")
            .await
            .expect("Failed to check the table"),
    );
    assert_eq!(
        db.columns(connection, "schema_notes")
            .await
            .expect("Failed to list the columns"),
        ["id", "text"]
    );

    let mut note = Note {
        text: "Remember the milk".into(),
        ..Default::default()
    };
    db.insert(connection, &mut note)
        .await
        .expect("Failed to insert the note");

    // Migrating keeps the existing rows
    db.add_column::<NoteV2, _>(connection, "pinned")
        .await
        .expect("Failed to add the pinned column");
    assert_eq!(
        db.columns(connection, "schema_notes")
            .await
            .expect("Failed to list the columns"),
        ["id", "text", "pinned"]
    );
    db.create_table::<NoteV2, _>(connection, true)
        .await
        .expect("Creating an existing table with if_not_exists must do nothing");
    let notes = db
        .find::<NoteV2>()
        .all(connection)
        .await
        .expect("Failed to load the migrated notes");
    assert_eq!(
        notes,
        [NoteV2 {
            id: note.id,
            text: "Remember the milk".into(),
            pinned: false,
        }]
    );
    db.find::<NoteV2>()
        .filter(r#""id" = ?"#, [Value::Int64(Some(note.id))])
        .update(connection, [("pinned", Value::Boolean(Some(true)))])
        .await
        .expect("Failed to pin the note");
    let pinned = db
        .find_by_pk::<NoteV2, _>(connection, note.id)
        .await
        .expect("Failed to find the note");
    assert!(pinned.pinned);

    db.drop_table::<NoteV2, _>(connection, false)
        .await
        .expect("Failed to drop the table");
    assert!(
        !db.table_exists(connection, "schema_notes")
            .await
            .expect("Failed to check the table"),
    );
    assert!(
        db.columns(connection, "schema_notes")
            .await
            .expect("Failed to list the columns")
            .is_empty()
    );
}
