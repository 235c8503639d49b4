#[cfg(test)]
mod tests {
    use keel_core::Config;
    use keel_sqlite::SqliteConnection;
    use keel_tests::{execute_tests, init_logs};

    const URL: &str = "sqlite::memory:";

    #[tokio::test]
    async fn sqlite() {
        init_logs();
        let connection = SqliteConnection::connect(URL)
            .await
            .expect("Could not open the database");
        let config = Config::from_url(URL).expect("The url names a known dialect");
        execute_tests(config, connection).await;
    }
}
