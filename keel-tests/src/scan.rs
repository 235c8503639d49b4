use keel::{Connection, Db, Model, Value, ZERO_TIMESTAMP, bind_placeholders};
use std::sync::LazyLock;
use time::{Date, PrimitiveDateTime, macros::datetime};
use tokio::sync::Mutex;

#[derive(Model, Debug, Default, Clone, PartialEq)]
#[keel(table = "scan_events")]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub happened_at: Option<PrimitiveDateTime>,
    pub day: Option<Date>,
    pub attendees: i32,
}

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn scan<C: Connection>(db: &Db, connection: &mut C) {
    let _lock = MUTEX.lock().await;
    db.drop_table::<Event, _>(connection, true)
        .await
        .expect("Failed to drop Event table");
    db.create_table::<Event, _>(connection, false)
        .await
        .expect("Failed to create Event table");
    let q = |name: &str| db.dialect().quoted(name);
    let (table, id, name) = (q("scan_events"), q("id"), q("name"));

    // Rows written by hand, bypassing the model
    db.execute(
        connection,
        &format!(
            "INSERT INTO {table} ({id}, {name}, {}, {}, {}) VALUES \
            (1, 'launch', '0000-00-00 00:00:00', '0000-00-00', 3), \
            (2, 'review', '2024-05-06 07:08:09.5', '2024-05-06', 12)",
            q("happened_at"),
            q("day"),
            q("attendees"),
        )
        .into(),
    )
    .await
    .expect("Failed to insert the raw events");

    let events = db
        .find::<Event>()
        .order_by(&id)
        .all(connection)
        .await
        .expect("Failed to load the events");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].happened_at, Some(ZERO_TIMESTAMP));
    assert_eq!(events[0].day, Some(ZERO_TIMESTAMP.date()));
    assert_eq!(events[0].attendees, 3);
    assert_eq!(
        events[1].happened_at,
        Some(datetime!(2024-05-06 07:08:09.5))
    );
    assert_eq!(events[1].day, Some(datetime!(2024-05-06 0:00).date()));

    // Labels match columns whatever their case, unknown labels are skipped
    let rows = db
        .fetch(
            connection,
            &format!(
                "SELECT {id} AS ID, UPPER({name}) AS NAME, 'extra' AS {} FROM {table} ORDER BY {id}",
                q("unmapped")
            )
            .into(),
        )
        .await
        .expect("Failed to fetch the raw rows");
    let meta = db
        .registry()
        .model::<Event>()
        .expect("Failed to register the model");
    let scanned = db
        .scanner()
        .scan_all::<Event>(&meta, &rows)
        .expect("Failed to scan the rows");
    assert_eq!(
        scanned
            .iter()
            .map(|v| (v.id, v.name.as_str()))
            .collect::<Vec<_>>(),
        [(1, "LAUNCH"), (2, "REVIEW")]
    );
    assert!(scanned.iter().all(|v| v.happened_at.is_none()));
    let plan = db.scanner().plan(&meta, &rows[0].labels);
    assert_eq!(plan.mapped(), 2);
    assert_eq!(plan.fields[2], None);

    // NULL into a field that cannot hold it keeps the default
    let statement = bind_placeholders(
        db.dialect(),
        &format!(
            "SELECT {id}, NULL AS {name}, NULL AS {}, NULL AS {} FROM {table} WHERE {id} = ?",
            q("attendees"),
            q("day"),
        ),
        vec![Value::Int64(Some(2))],
    )
    .expect("Failed to bind the statement");
    let rows = db
        .fetch(connection, &statement)
        .await
        .expect("Failed to fetch the row with NULLs");
    let scanned = db
        .scanner()
        .scan_all::<Event>(&meta, &rows)
        .expect("NULL must not fail on non nullable fields");
    assert_eq!(
        scanned,
        [Event {
            id: 2,
            ..Default::default()
        }]
    );
}
