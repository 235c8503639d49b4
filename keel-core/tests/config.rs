#[cfg(test)]
mod tests {
    use keel_core::{Config, DATABASE_URL_VAR, DIALECT_VAR, Db, ErrorKind};
    use std::env;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.dialect, "sqlite");
        assert_eq!(config.builder_pool_size, 32);
        let config = Config::new("postgres").with_builder_pool_size(4);
        assert_eq!(config.dialect, "postgres");
        assert_eq!(config.builder_pool_size, 4);
    }

    #[test]
    fn dialect_from_url_scheme() {
        for (url, dialect) in [
            ("sqlite::memory:", "sqlite"),
            ("sqlite://data.db?mode=rwc", "sqlite"),
            ("postgres://user@localhost/db", "postgres"),
            ("postgresql://localhost", "postgres"),
            ("mysql://root@localhost:3306/db", "mysql"),
            ("mariadb://localhost", "mysql"),
            ("sqlserver://localhost", "sqlserver"),
            ("mssql://localhost", "sqlserver"),
            ("oracle://localhost:1521/xe", "oracle"),
            ("MySQL://localhost", "mysql"),
        ] {
            assert_eq!(Config::from_url(url).unwrap().dialect, dialect, "{url}");
        }
        for url in ["redis://localhost", "no scheme"] {
            let error = Config::from_url(url).expect_err(url);
            assert!(
                matches!(ErrorKind::of(&error), Some(ErrorKind::UnknownDialect(..))),
                "{error:#}"
            );
        }
    }

    #[test]
    fn from_env() {
        // The only test of this binary touching the environment
        unsafe {
            env::remove_var(DATABASE_URL_VAR);
            env::remove_var(DIALECT_VAR);
        }
        assert_eq!(Config::from_env().unwrap(), Config::default());
        unsafe { env::set_var(DIALECT_VAR, "oracle") };
        assert_eq!(Config::from_env().unwrap().dialect, "oracle");
        unsafe { env::set_var(DATABASE_URL_VAR, "postgres://localhost/db") };
        assert_eq!(Config::from_env().unwrap().dialect, "postgres");
        unsafe {
            env::remove_var(DATABASE_URL_VAR);
            env::remove_var(DIALECT_VAR);
        }
    }

    #[test]
    fn db_uses_the_configured_dialect() {
        let db = Db::new(Config::new("mssql").with_builder_pool_size(3)).unwrap();
        assert_eq!(db.dialect().name(), "sqlserver");
        assert_eq!(db.builders().capacity(), 3);
        let error = Db::new(Config::new("db2")).err().expect("db2 is unknown");
        assert_eq!(
            ErrorKind::of(&error),
            Some(&ErrorKind::UnknownDialect("db2".into()))
        );
    }
}
