#[cfg(test)]
mod tests {
    use keel_core::{Executor, Statement, Value};
    use keel_sqlite::SqliteConnection;
    use keel_tests::{init_logs, silent_logs};
    use std::{env, path::Path, sync::LazyLock};
    use tokio::{fs, sync::Mutex};

    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    #[tokio::test]
    async fn create_database() {
        init_logs();
        let _guard = MUTEX.lock().await;
        let path = env::temp_dir().join("keel_creation.sqlite");
        let path = path.to_str().expect("The temporary path is not UTF-8");
        if Path::new(path).exists() {
            fs::remove_file(path)
                .await
                .expect(format!("Failed to remove test database file {path}").as_str());
        }
        let mut connection = SqliteConnection::connect(&format!("sqlite://{path}?mode=rwc"))
            .await
            .expect("Could not open the database");
        assert!(
            Path::new(path).exists(),
            "Database file should be created after connection"
        );
        connection
            .execute(&Statement::from("CREATE TABLE kept (value INTEGER)"))
            .await
            .expect("Failed to create a table");
        connection.close().await;

        let mut connection = SqliteConnection::connect(&format!("sqlite://{path}"))
            .await
            .expect("Could not open the existing database");
        let rows = connection
            .fetch(&Statement::from(
                "SELECT name FROM sqlite_master WHERE type = 'table'",
            ))
            .await
            .expect("Failed to list the tables");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some(&Value::from("kept")));
        connection.close().await;
        fs::remove_file(path)
            .await
            .expect(format!("Failed to remove test database file {path}").as_str());
    }

    #[tokio::test]
    async fn last_insert_id() {
        let mut connection = SqliteConnection::connect("sqlite::memory:")
            .await
            .expect("Could not open the database");
        connection
            .execute(&"CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT)".into())
            .await
            .expect("Failed to create a table");
        for expected in 1..=3 {
            let result = connection
                .execute(&"INSERT INTO items (name) VALUES ('item')".into())
                .await
                .expect("Failed to insert");
            assert_eq!(result.rows_affected, 1);
            assert_eq!(result.last_affected_id, Some(expected));
        }
    }

    #[tokio::test]
    async fn wrong_url() {
        silent_logs! {
            assert!(
                SqliteConnection::connect("sqlite:///keel/missing/directory/data.db?mode=rw")
                    .await
                    .is_err()
            );
        };
    }
}
