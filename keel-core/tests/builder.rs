#[cfg(test)]
mod tests {
    use indoc::indoc;
    use keel_core::{
        BuilderPool, ErrorKind, SqlBuilder, Value, bind_placeholders,
        dialect::{MySqlDialect, OracleDialect, PostgresDialect, SqlServerDialect, SqliteDialect},
    };
    use std::collections::BTreeMap;

    fn invalid_sql(result: keel_core::Result<keel_core::Statement>) -> String {
        let error = result.expect_err("Expected the render to fail");
        match ErrorKind::of(&error) {
            Some(ErrorKind::InvalidSql(message)) => message.clone(),
            _ => panic!("Expected InvalidSql, found {error:#}"),
        }
    }

    #[test]
    fn select_everything() {
        let mut builder = SqlBuilder::new();
        builder.table("users");
        let statement = builder.render_select(&SqliteDialect).unwrap();
        assert_eq!(statement.sql, r#"SELECT "users".* FROM "users""#);
        assert!(statement.args.is_empty());
    }

    #[test]
    fn clauses_render_in_order() {
        let mut builder = SqlBuilder::new();
        builder
            .table("orders")
            .alias("o")
            .limit(10)
            .order_by("o.created DESC")
            .having("COUNT(*) > ?", [Value::Int64(Some(2))])
            .group_by(["o.user_id"])
            .filter("o.total > ?", [Value::Int32(Some(100))])
            .join("JOIN users u ON u.id = o.user_id")
            .select(["o.user_id", "COUNT(*)"])
            .offset(5);
        let statement = builder.render_select(&PostgresDialect).unwrap();
        assert_eq!(
            statement.sql,
            indoc! {r#"
                SELECT o.user_id, COUNT(*) FROM "orders" o JOIN users u ON u.id = o.user_id WHERE (o.total > $1) GROUP BY o.user_id HAVING (COUNT(*) > $2) ORDER BY o.created DESC LIMIT 10 OFFSET 5
            "#}
            .trim()
        );
        assert_eq!(
            statement.args,
            [Value::Int32(Some(100)), Value::Int64(Some(2))]
        );
    }

    #[test]
    fn combinators_keep_left_to_right_order() {
        let mut builder = SqlBuilder::new();
        builder
            .table("users")
            .filter("a = ?", [Value::Int32(Some(1))])
            .or_filter("b = ?", [Value::Int32(Some(2))])
            .filter("c = ?", [Value::Int32(Some(3))]);
        let statement = builder.render_select(&PostgresDialect).unwrap();
        assert_eq!(
            statement.sql,
            r#"SELECT "users".* FROM "users" WHERE ((a = $1) OR (b = $2)) AND (c = $3)"#
        );
        assert_eq!(statement.args.len(), 3);
    }

    #[test]
    fn repeated_select_and_filter_accumulate() {
        let mut builder = SqlBuilder::new();
        builder
            .table("users")
            .select(["id"])
            .filter("age > ?", [Value::Int32(Some(18))])
            .select(["name"])
            .filter("name <> ?", [Value::from("")])
            .select(["email"]);
        let statement = builder.render_select(&SqliteDialect).unwrap();
        assert_eq!(
            statement.sql,
            r#"SELECT id, name, email FROM "users" WHERE (age > ?) AND (name <> ?)"#
        );
        assert_eq!(statement.args.len(), 2);
    }

    #[test]
    fn filter_in() {
        let mut builder = SqlBuilder::new();
        builder.table("users").filter_in(
            r#""id""#,
            [1, 2, 3].map(|v: i64| Value::Int64(Some(v))),
        );
        let statement = builder.render_select(&SqlServerDialect).unwrap();
        assert_eq!(
            statement.sql,
            r#"SELECT [users].* FROM [users] WHERE ("id" IN (@p1, @p2, @p3))"#
        );
        assert_eq!(statement.args.len(), 3);
    }

    #[test]
    fn qualifier_follows_the_alias() {
        let mut builder = SqlBuilder::new();
        builder.table("roles");
        assert_eq!(builder.qualifier(&PostgresDialect), r#""roles""#);
        builder.alias("r").or_filter("r.name = ?", [Value::from("admin")]);
        builder.or_filter("r.name = ?", [Value::from("owner")]);
        let qualifier = builder.qualifier(&PostgresDialect);
        assert_eq!(qualifier, "r");
        builder.filter_in(&format!("{qualifier}.id"), [Value::Int64(Some(7))]);
        let statement = builder.render_select(&PostgresDialect).unwrap();
        assert_eq!(
            statement.sql,
            r#"SELECT r.* FROM "roles" r WHERE ((r.name = $1) OR (r.name = $2)) AND (r.id IN ($3))"#
        );
        assert_eq!(statement.args.len(), 3);
    }

    #[test]
    fn empty_filter_in_matches_nothing() {
        let mut builder = SqlBuilder::new();
        builder
            .table("users")
            .filter("active = ?", [Value::Boolean(Some(true))])
            .filter_in("id", Vec::<Value>::new());
        let statement = builder.render_select(&PostgresDialect).unwrap();
        assert_eq!(
            statement.sql,
            r#"SELECT "users".* FROM "users" WHERE (active = $1) AND (1 = 0)"#
        );
        assert_eq!(statement.args, [Value::Boolean(Some(true))]);
    }

    #[test]
    fn unsafe_join_is_rejected_at_render() {
        for clause in [
            "JOIN a ON 1 = 1; DROP TABLE users",
            "JOIN a ON 1 = 1 -- rest",
            "JOIN a /* hidden */ ON 1 = 1",
            "JOIN a ON 1 = 1 */",
        ] {
            let mut builder = SqlBuilder::new();
            builder.table("users").join(clause);
            let message = invalid_sql(builder.render_select(&SqliteDialect));
            assert!(message.contains("forbidden token"), "{message}");
        }
    }

    #[test]
    fn missing_table() {
        let builder = SqlBuilder::new();
        let message = invalid_sql(builder.render_select(&SqliteDialect));
        assert_eq!(message, "The statement has no table");
    }

    #[test]
    fn count() {
        let mut builder = SqlBuilder::new();
        builder
            .table("users")
            .filter("age > ?", [Value::Int32(Some(30))])
            .order_by("name")
            .limit(3);
        let statement = builder.render_count(&PostgresDialect).unwrap();
        assert_eq!(
            statement.sql,
            r#"SELECT COUNT(*) FROM "users" WHERE (age > $1)"#
        );

        builder.group_by(["city"]).select(["city"]);
        let statement = builder.render_count(&PostgresDialect).unwrap();
        assert_eq!(
            statement.sql,
            r#"SELECT COUNT(*) FROM (SELECT city FROM "users" WHERE (age > $1) GROUP BY city) grouped"#
        );
    }

    #[test]
    fn update_sorts_assignments() {
        let mut builder = SqlBuilder::new();
        builder.table("users").filter(r#""id" = ?"#, [Value::Int64(Some(7))]);
        let assignments = BTreeMap::from([
            ("name".to_string(), Value::from("bob")),
            ("age".to_string(), Value::Int32(Some(41))),
            ("email".to_string(), Value::Varchar(None)),
        ]);
        let statement = builder
            .render_update(&PostgresDialect, &assignments)
            .unwrap();
        assert_eq!(
            statement.sql,
            r#"UPDATE "users" SET "age" = $1, "email" = $2, "name" = $3 WHERE ("id" = $4)"#
        );
        assert_eq!(
            statement.args,
            [
                Value::Int32(Some(41)),
                Value::Varchar(None),
                Value::from("bob"),
                Value::Int64(Some(7)),
            ]
        );
        let message = invalid_sql(builder.render_update(&PostgresDialect, &BTreeMap::new()));
        assert!(message.contains("without any assignment"), "{message}");
    }

    #[test]
    fn delete_requires_a_predicate() {
        let mut builder = SqlBuilder::new();
        builder.table("users");
        let message = invalid_sql(builder.render_delete(&MySqlDialect));
        assert_eq!(message, "Refusing to DELETE from `users` without a predicate");
        builder.filter("`id` = ?", [Value::Int64(Some(1))]);
        let statement = builder.render_delete(&MySqlDialect).unwrap();
        assert_eq!(statement.sql, "DELETE FROM `users` WHERE (`id` = ?)");
    }

    #[test]
    fn last_order_limit_offset_win() {
        let mut builder = SqlBuilder::new();
        builder
            .table("t")
            .order_by("a")
            .order_by("b")
            .limit(1)
            .limit(2)
            .offset(3)
            .offset(4);
        let statement = builder.render_select(&SqliteDialect).unwrap();
        assert_eq!(
            statement.sql,
            r#"SELECT "t".* FROM "t" ORDER BY b LIMIT 2 OFFSET 4"#
        );
    }

    #[test]
    fn limit_and_offset_per_dialect() {
        let mut builder = SqlBuilder::new();
        builder.table("t").offset(5);
        assert_eq!(
            builder.render_select(&SqliteDialect).unwrap().sql,
            r#"SELECT "t".* FROM "t" LIMIT -1 OFFSET 5"#
        );
        assert_eq!(
            builder.render_select(&MySqlDialect).unwrap().sql,
            "SELECT `t`.* FROM `t` LIMIT 18446744073709551615 OFFSET 5"
        );
        assert_eq!(
            builder.render_select(&PostgresDialect).unwrap().sql,
            r#"SELECT "t".* FROM "t" OFFSET 5"#
        );
        builder.limit(10);
        assert_eq!(
            builder.render_select(&SqlServerDialect).unwrap().sql,
            "SELECT [t].* FROM [t] ORDER BY (SELECT NULL) OFFSET 5 ROWS FETCH NEXT 10 ROWS ONLY"
        );
        assert_eq!(
            builder.render_select(&OracleDialect).unwrap().sql,
            r#"SELECT "t".* FROM "t" OFFSET 5 ROWS FETCH NEXT 10 ROWS ONLY"#
        );
        builder.order_by("id");
        assert_eq!(
            builder.render_select(&SqlServerDialect).unwrap().sql,
            "SELECT [t].* FROM [t] ORDER BY id OFFSET 5 ROWS FETCH NEXT 10 ROWS ONLY"
        );
    }

    #[test]
    fn table_expressions_are_not_quoted() {
        let mut builder = SqlBuilder::new();
        builder.table("main.users").select(["id"]);
        assert_eq!(
            builder.render_select(&SqliteDialect).unwrap().sql,
            "SELECT id FROM main.users"
        );
    }

    #[test]
    fn placeholders_are_numbered_in_order() {
        let args = (0..12).map(|v| Value::Int32(Some(v))).collect::<Vec<_>>();
        let sql = vec!["?"; 12].join(", ");
        let statement = bind_placeholders(&PostgresDialect, &sql, args.clone()).unwrap();
        let expected = (1..=12).map(|v| format!("${v}")).collect::<Vec<_>>().join(", ");
        assert_eq!(statement.sql, expected);
        let statement = bind_placeholders(&OracleDialect, &sql, args.clone()).unwrap();
        assert!(statement.sql.starts_with(":1, :2, :3"));
        assert!(statement.sql.ends_with(":11, :12"));
        let statement = bind_placeholders(&SqlServerDialect, &sql, args).unwrap();
        assert!(statement.sql.ends_with("@p11, @p12"));
    }

    #[test]
    fn placeholders_inside_literals_are_kept() {
        let statement = bind_placeholders(
            &PostgresDialect,
            r#"SELECT '?', "a?b", 'it''s ?' FROM t WHERE x = ?"#,
            vec![Value::Int32(Some(1))],
        )
        .unwrap();
        assert_eq!(
            statement.sql,
            r#"SELECT '?', "a?b", 'it''s ?' FROM t WHERE x = $1"#
        );
    }

    #[test]
    fn placeholder_count_must_match() {
        let result = bind_placeholders(&SqliteDialect, "SELECT ? + ?", vec![Value::Null]);
        let message = invalid_sql(result);
        assert!(message.contains("2 placeholders but 1 arguments"), "{message}");
    }

    #[test]
    fn pool_reuses_reset_builders() {
        let pool = BuilderPool::new(2);
        assert_eq!(pool.idle(), 0);
        {
            let mut builder = pool.acquire();
            builder
                .table("users")
                .filter("a = ?", [Value::Int32(Some(1))]);
            assert!(builder.has_predicate());
        }
        assert_eq!(pool.idle(), 1);
        {
            let builder = pool.acquire();
            assert!(!builder.has_predicate());
            assert_eq!(pool.idle(), 0);
            let message = invalid_sql(builder.render_select(&SqliteDialect));
            assert_eq!(message, "The statement has no table");
        }
        let (a, b, c) = (pool.acquire(), pool.acquire(), pool.acquire());
        drop((a, b, c));
        assert_eq!(pool.idle(), pool.capacity());
    }
}
