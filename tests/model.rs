#[cfg(test)]
mod tests {
    use indoc::indoc;
    use keel::{
        Config, Db, Dialect, ErrorKind, FieldType, Model, Registry, Value,
        dialect::{MySqlDialect, PostgresDialect, SqliteDialect},
    };
    use rust_decimal::Decimal;
    use std::{sync::Arc, thread};
    use time::{Date, PrimitiveDateTime};
    use uuid::Uuid;

    #[derive(Model, Default, Clone)]
    struct OrderLine {
        id: i32,
        #[keel("column:product_code;size:16;not_null")]
        code: String,
        quantity: u16,
        note: Option<String>,
        price: Decimal,
        shipped_on: Option<Date>,
        #[keel(ignore)]
        #[allow(dead_code)]
        scratch: Vec<String>,
    }

    #[derive(Model, Default, Clone)]
    struct Address {
        street: String,
        #[keel("column:postal_code")]
        zip: Option<String>,
    }

    #[derive(Model, Default, Clone)]
    #[keel(table = "people")]
    struct Person {
        #[keel("pk")]
        code: Uuid,
        #[keel("default:'anonymous'")]
        name: String,
        #[keel(embed)]
        home: Address,
        #[keel("auto_time")]
        created_at: Option<PrimitiveDateTime>,
        photo: Option<Vec<u8>>,
    }

    fn create_table<T: Model>(dialect: &dyn Dialect) -> String {
        let registry = Registry::new();
        let meta = registry.model::<T>().expect("The model is valid");
        let mut out = String::new();
        dialect.write_create_table(&mut out, &meta, false);
        out
    }

    #[test]
    fn metadata() {
        let registry = Registry::new();
        let meta = registry.model::<OrderLine>().unwrap();
        assert_eq!(meta.type_name, "OrderLine");
        assert_eq!(meta.table, "order_line");
        assert_eq!(
            meta.fields
                .iter()
                .map(|v| v.column.as_str())
                .collect::<Vec<_>>(),
            ["id", "product_code", "quantity", "note", "price", "shipped_on"]
        );
        let pk = meta.primary_key().expect("`id` is the implicit key");
        assert_eq!(pk.name, "id");
        assert!(pk.auto_increment);
        let code = meta.column("product_code").unwrap();
        assert_eq!(code.name, "code");
        assert_eq!(code.size, Some(16));
        assert!(!code.nullable);
        assert_eq!(meta.column("quantity").unwrap().ty, FieldType::UInt16);
        assert!(meta.column("note").unwrap().nullable);
        assert_eq!(meta.column("shipped_on").unwrap().ty, FieldType::Date);
        assert!(meta.column("scratch").is_none());
        assert!(meta.associations.is_empty());
    }

    #[test]
    fn embedded_fields() {
        let registry = Registry::new();
        let meta = registry.model::<Person>().unwrap();
        assert_eq!(meta.table, "people");
        let pk = meta.primary_key().unwrap();
        assert_eq!(pk.column, "code");
        assert!(!pk.auto_increment, "Only integer keys are generated");
        let zip = meta.column("postal_code").unwrap();
        assert_eq!(&*zip.path, &[2, 1]);
        assert!(zip.nullable);
        assert_eq!(&*meta.column("street").unwrap().path, &[2, 0]);

        let mut person = Person::default();
        zip.set(&mut person, "75001".into()).unwrap();
        assert_eq!(person.home.zip.as_deref(), Some("75001"));
        assert_eq!(zip.get(&person).unwrap(), Value::from("75001"));
    }

    #[test]
    fn create_table_sqlite() {
        assert_eq!(
            create_table::<OrderLine>(&SqliteDialect),
            indoc! {r#"
                CREATE TABLE "order_line" ("id" INTEGER PRIMARY KEY AUTOINCREMENT, "product_code" VARCHAR(16) NOT NULL, "quantity" INTEGER NOT NULL, "note" TEXT, "price" NUMERIC NOT NULL, "shipped_on" TEXT)
            "#}
            .trim()
        );
        assert_eq!(
            create_table::<Person>(&SqliteDialect),
            indoc! {r#"
                CREATE TABLE "people" ("code" TEXT PRIMARY KEY, "name" TEXT NOT NULL DEFAULT 'anonymous', "street" TEXT NOT NULL, "postal_code" TEXT, "created_at" TEXT, "photo" BLOB)
            "#}
            .trim()
        );
    }

    #[test]
    fn create_table_postgres() {
        assert_eq!(
            create_table::<OrderLine>(&PostgresDialect),
            indoc! {r#"
                CREATE TABLE "order_line" ("id" SERIAL PRIMARY KEY, "product_code" VARCHAR(16) NOT NULL, "quantity" INTEGER NOT NULL, "note" TEXT, "price" NUMERIC NOT NULL, "shipped_on" DATE)
            "#}
            .trim()
        );
        assert_eq!(
            create_table::<Person>(&PostgresDialect),
            indoc! {r#"
                CREATE TABLE "people" ("code" UUID PRIMARY KEY, "name" TEXT NOT NULL DEFAULT 'anonymous', "street" TEXT NOT NULL, "postal_code" TEXT, "created_at" TIMESTAMP, "photo" BYTEA)
            "#}
            .trim()
        );
    }

    #[test]
    fn create_table_mysql() {
        let sql = create_table::<OrderLine>(&MySqlDialect);
        assert!(sql.starts_with("CREATE TABLE `order_line` (`id` "), "{sql}");
        assert!(sql.contains("AUTO_INCREMENT PRIMARY KEY"), "{sql}");
        assert!(sql.contains("`product_code` VARCHAR(16) NOT NULL"), "{sql}");
    }

    #[test]
    fn invalid_models() {
        #[derive(Model, Default, Clone)]
        struct SameColumn {
            #[keel("column:value")]
            first: i32,
            #[keel("column:value")]
            second: i32,
        }
        #[derive(Model, Default, Clone)]
        struct TwoKeys {
            #[keel("pk")]
            first: i32,
            #[keel("pk")]
            second: i32,
        }
        #[derive(Model, Default, Clone)]
        struct ColumnWithJoin {
            #[keel("join_table:somewhere")]
            value: i32,
        }
        let registry = Registry::new();
        for error in [
            registry.model::<SameColumn>().unwrap_err(),
            registry.model::<TwoKeys>().unwrap_err(),
            registry.model::<ColumnWithJoin>().unwrap_err(),
        ] {
            assert!(
                matches!(ErrorKind::of(&error), Some(ErrorKind::InvalidModel(..))),
                "{error:#}"
            );
        }
        assert!(registry.is_empty(), "Invalid models are not registered");
    }

    #[test]
    fn registry_parses_once() {
        let registry = Arc::new(Registry::new());
        let models = thread::scope(|s| {
            let handles = (0..8)
                .map(|_| s.spawn(|| registry.model::<OrderLine>().unwrap()))
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|v| v.join().unwrap())
                .collect::<Vec<_>>()
        });
        let first = registry.model::<OrderLine>().unwrap();
        assert!(models.iter().all(|v| Arc::ptr_eq(v, &first)));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.generation(), 1);

        registry.model::<Person>().unwrap();
        assert_eq!(registry.generation(), 2);
        registry.model::<Person>().unwrap();
        assert_eq!(registry.generation(), 2);

        assert!(Arc::ptr_eq(
            &registry.model_by_table("order_line").unwrap(),
            &first
        ));
        let error = registry.model_by_table("missing").unwrap_err();
        assert_eq!(
            ErrorKind::of(&error),
            Some(&ErrorKind::ModelNotFound("missing".into()))
        );
    }

    #[test]
    fn db_registry_is_shared() {
        let db = Db::new(Config::default()).unwrap();
        let meta = db.registry().model::<Person>().unwrap();
        assert!(Arc::ptr_eq(
            &meta,
            &db.relations().registry().model::<Person>().unwrap()
        ));
    }
}
