#[cfg(test)]
mod tests {
    use keel_core::{
        Dialect, DialectRegistry, ErrorKind, Field, FieldType, ForeignKey,
        dialect::{MySqlDialect, OracleDialect, PostgresDialect, SqlServerDialect, SqliteDialect},
    };

    fn field(column: &str, ty: FieldType) -> Field {
        Field {
            name: "field",
            column: column.into(),
            ty,
            nullable: false,
            path: [0].into(),
            primary_key: false,
            auto_increment: false,
            auto_time: false,
            auto_update: false,
            unique: false,
            not_null: false,
            size: None,
            default: None,
            references: None,
            tag: "",
        }
    }

    fn auto_key() -> Field {
        Field {
            primary_key: true,
            auto_increment: true,
            ..field("id", FieldType::Int64)
        }
    }

    fn definition(dialect: &dyn Dialect, field: &Field) -> String {
        let mut out = String::new();
        dialect.write_column_definition(&mut out, field);
        out
    }

    fn insert(dialect: &dyn Dialect, columns: &[&str], rows: usize, returning: Option<&str>) -> String {
        let mut out = String::new();
        dialect.write_insert(&mut out, "users", columns, rows, returning);
        out
    }

    #[test]
    fn quoting() {
        assert_eq!(SqliteDialect.quoted(r#"we"ird"#), r#""we""ird""#);
        assert_eq!(MySqlDialect.quoted("we`ird"), "`we``ird`");
        assert_eq!(SqlServerDialect.quoted("we]ird"), "[we]]ird]");
        assert_eq!(PostgresDialect.quoted("plain"), r#""plain""#);
    }

    #[test]
    fn placeholders() {
        let render = |dialect: &dyn Dialect, index| {
            let mut out = String::new();
            dialect.write_placeholder(&mut out, index);
            out
        };
        assert_eq!(render(&SqliteDialect, 3), "?");
        assert_eq!(render(&MySqlDialect, 3), "?");
        assert_eq!(render(&PostgresDialect, 3), "$3");
        assert_eq!(render(&SqlServerDialect, 3), "@p3");
        assert_eq!(render(&OracleDialect, 3), ":3");
    }

    #[test]
    fn auto_increment_keys() {
        let key = auto_key();
        assert_eq!(
            definition(&SqliteDialect, &key),
            r#""id" INTEGER PRIMARY KEY AUTOINCREMENT"#
        );
        assert_eq!(definition(&PostgresDialect, &key), r#""id" BIGSERIAL PRIMARY KEY"#);
        assert_eq!(
            definition(&MySqlDialect, &key),
            "`id` BIGINT AUTO_INCREMENT PRIMARY KEY"
        );
        assert_eq!(
            definition(&SqlServerDialect, &key),
            "[id] BIGINT IDENTITY(1,1) PRIMARY KEY"
        );
        assert_eq!(
            definition(&OracleDialect, &key),
            r#""id" NUMBER(19) GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY"#
        );
    }

    #[test]
    fn column_flags() {
        let email = Field {
            unique: true,
            size: Some(120),
            default: Some("'none'".into()),
            ..field("email", FieldType::Varchar)
        };
        assert_eq!(
            definition(&PostgresDialect, &email),
            r#""email" VARCHAR(120) NOT NULL DEFAULT 'none' UNIQUE"#
        );
        let owner = Field {
            nullable: true,
            references: Some(ForeignKey {
                table: Some("users".into()),
                column: "id".into(),
            }),
            ..field("owner_id", FieldType::Int64)
        };
        assert_eq!(
            definition(&SqliteDialect, &owner),
            r#""owner_id" INTEGER REFERENCES "users"("id")"#
        );
        let implied = Field {
            references: Some(ForeignKey {
                table: None,
                column: "owner".into(),
            }),
            ..field("owner_id", FieldType::Int64)
        };
        assert_eq!(
            definition(&SqliteDialect, &implied),
            r#""owner_id" INTEGER NOT NULL"#
        );
    }

    #[test]
    fn text_types_depend_on_keys() {
        let text = field("name", FieldType::Varchar);
        let key = Field {
            unique: true,
            ..field("code", FieldType::Varchar)
        };
        assert_eq!(definition(&SqliteDialect, &text), r#""name" TEXT NOT NULL"#);
        assert_eq!(definition(&MySqlDialect, &text), "`name` TEXT NOT NULL");
        assert_eq!(
            definition(&MySqlDialect, &key),
            "`code` VARCHAR(255) NOT NULL UNIQUE"
        );
        assert_eq!(
            definition(&SqlServerDialect, &text),
            "[name] NVARCHAR(MAX) NOT NULL"
        );
        assert_eq!(
            definition(&SqlServerDialect, &key),
            "[code] NVARCHAR(450) NOT NULL UNIQUE"
        );
        assert_eq!(
            definition(&OracleDialect, &text),
            r#""name" VARCHAR2(4000) NOT NULL"#
        );
    }

    #[test]
    fn scalar_types() {
        let cases = [
            (FieldType::Boolean, ["BOOLEAN", "BOOLEAN", "BIT", "NUMBER(1)"]),
            (FieldType::UInt8, ["INTEGER", "SMALLINT", "TINYINT", "NUMBER(3)"]),
            (FieldType::Float64, ["REAL", "DOUBLE PRECISION", "FLOAT", "BINARY_DOUBLE"]),
            (FieldType::Decimal, ["NUMERIC", "NUMERIC", "DECIMAL(38, 10)", "NUMBER"]),
            (FieldType::Blob, ["BLOB", "BYTEA", "VARBINARY(MAX)", "BLOB"]),
            (
                FieldType::Timestamp,
                ["TEXT", "TIMESTAMP", "DATETIME2", "TIMESTAMP"],
            ),
            (
                FieldType::TimestampWithTimezone,
                ["TEXT", "TIMESTAMPTZ", "DATETIMEOFFSET", "TIMESTAMP WITH TIME ZONE"],
            ),
            (
                FieldType::Uuid,
                ["TEXT", "UUID", "UNIQUEIDENTIFIER", "VARCHAR2(36)"],
            ),
        ];
        let dialects: [&dyn Dialect; 4] = [
            &SqliteDialect,
            &PostgresDialect,
            &SqlServerDialect,
            &OracleDialect,
        ];
        for (ty, expected) in cases {
            for (dialect, expected) in dialects.iter().zip(expected) {
                let mut out = String::new();
                dialect.write_column_type(&mut out, &field("c", ty));
                assert_eq!(out, expected, "{ty:?} on {}", dialect.name());
            }
        }
    }

    #[test]
    #[should_panic(expected = "Postgres has no type able to store")]
    fn postgres_rejects_u64() {
        let mut out = String::new();
        PostgresDialect.write_column_type(&mut out, &field("big", FieldType::UInt64));
    }

    #[test]
    #[should_panic(expected = "Oracle has no time of day type")]
    fn oracle_rejects_time() {
        let mut out = String::new();
        OracleDialect.write_column_type(&mut out, &field("at", FieldType::Time));
    }

    #[test]
    fn inserts() {
        assert_eq!(
            insert(&SqliteDialect, &["name", "age"], 2, None),
            r#"INSERT INTO "users" ("name", "age") VALUES (?, ?), (?, ?)"#
        );
        assert_eq!(
            insert(&PostgresDialect, &["name"], 1, Some("id")),
            r#"INSERT INTO "users" ("name") VALUES (?) RETURNING "id""#
        );
        assert_eq!(
            insert(&SqliteDialect, &[], 1, None),
            r#"INSERT INTO "users" DEFAULT VALUES"#
        );
        assert_eq!(insert(&MySqlDialect, &[], 1, None), "INSERT INTO `users` () VALUES ()");
        assert_eq!(
            insert(&SqlServerDialect, &["name"], 2, Some("id")),
            "INSERT INTO [users] ([name]) OUTPUT INSERTED.[id] VALUES (?), (?)"
        );
        assert_eq!(
            insert(&SqlServerDialect, &[], 1, Some("id")),
            "INSERT INTO [users] OUTPUT INSERTED.[id] DEFAULT VALUES"
        );
        assert_eq!(
            insert(&OracleDialect, &["name"], 2, None),
            r#"INSERT ALL INTO "users" ("name") VALUES (?) INTO "users" ("name") VALUES (?) SELECT 1 FROM DUAL"#
        );
        assert_eq!(
            insert(&OracleDialect, &[], 1, None),
            r#"INSERT INTO "users" VALUES (DEFAULT)"#
        );
    }

    #[test]
    fn returning_support() {
        assert!(PostgresDialect.supports_returning());
        assert!(SqlServerDialect.supports_returning());
        assert!(!SqliteDialect.supports_returning());
        assert!(!MySqlDialect.supports_returning());
        assert!(!OracleDialect.supports_returning());
    }

    #[test]
    fn alter_table() {
        let column = Field {
            nullable: true,
            ..field("nickname", FieldType::Varchar)
        };
        let render = |dialect: &dyn Dialect| {
            let mut out = String::new();
            dialect.write_add_column(&mut out, "users", &column);
            out
        };
        assert_eq!(
            render(&SqliteDialect),
            r#"ALTER TABLE "users" ADD COLUMN "nickname" TEXT"#
        );
        assert_eq!(
            render(&SqlServerDialect),
            "ALTER TABLE [users] ADD [nickname] NVARCHAR(MAX)"
        );
        assert_eq!(
            render(&OracleDialect),
            r#"ALTER TABLE "users" ADD ("nickname" VARCHAR2(4000))"#
        );
    }

    #[test]
    fn drop_table() {
        let mut out = String::new();
        MySqlDialect.write_drop_table(&mut out, "users", true);
        assert_eq!(out, "DROP TABLE IF EXISTS `users`");
    }

    #[test]
    fn introspection_takes_the_table_name() {
        let dialects: [&dyn Dialect; 5] = [
            &SqliteDialect,
            &PostgresDialect,
            &MySqlDialect,
            &SqlServerDialect,
            &OracleDialect,
        ];
        for dialect in dialects {
            let mut out = String::new();
            dialect.write_table_exists(&mut out);
            assert_eq!(out.matches('?').count(), 1, "{out}");
            out.clear();
            dialect.write_columns_query(&mut out);
            assert_eq!(out.matches('?').count(), 1, "{out}");
        }
    }

    #[test]
    fn registry() {
        let registry = DialectRegistry::with_defaults();
        for (key, name) in [
            ("sqlite", "sqlite"),
            ("postgres", "postgres"),
            ("PostgreSQL", "postgres"),
            ("mysql", "mysql"),
            ("sqlserver", "sqlserver"),
            ("mssql", "sqlserver"),
            ("oracle", "oracle"),
        ] {
            assert_eq!(registry.get(key).unwrap().name(), name);
        }
        let error = registry.get("db2").err().expect("db2 is not registered");
        assert_eq!(
            ErrorKind::of(&error),
            Some(&ErrorKind::UnknownDialect("db2".into()))
        );
        assert!(DialectRegistry::empty().get("sqlite").is_err());
    }
}
