#[cfg(test)]
mod tests {
    use keel::{Config, Db, Model, Value};
    use keel_sqlite::SqliteConnection;

    #[derive(Model, Debug, Default, Clone, PartialEq)]
    struct Author {
        id: i64,
        #[keel("size:80;unique")]
        name: String,
        books: Vec<Book>,
    }

    #[derive(Model, Debug, Default, Clone, PartialEq)]
    struct Book {
        id: i64,
        #[keel("fk:author.id")]
        author_id: i64,
        title: String,
        year: Option<i32>,
    }

    #[tokio::test]
    async fn quickstart() {
        let db = Db::new(Config::from_url("sqlite::memory:").unwrap()).unwrap();
        let mut connection = SqliteConnection::connect("sqlite::memory:")
            .await
            .expect("Could not open the database");
        db.create_table::<Author, _>(&mut connection, true)
            .await
            .unwrap();
        db.create_table::<Book, _>(&mut connection, true)
            .await
            .unwrap();

        let mut author = Author {
            name: "Italo Calvino".into(),
            ..Default::default()
        };
        db.insert(&mut connection, &mut author).await.unwrap();
        for (title, year) in [
            ("Invisible Cities", Some(1972)),
            ("The Baron in the Trees", Some(1957)),
            ("Unpublished draft", None),
        ] {
            let mut book = Book {
                author_id: author.id,
                title: title.into(),
                year,
                ..Default::default()
            };
            db.insert(&mut connection, &mut book).await.unwrap();
        }

        let authors = db
            .find::<Author>()
            .preload_with("books", |books| {
                books
                    .filter(r#""year" IS NOT NULL"#, [])
                    .order_by(r#""year""#);
            })
            .all(&mut connection)
            .await
            .unwrap();
        assert_eq!(authors.len(), 1);
        assert_eq!(
            authors[0]
                .books
                .iter()
                .map(|v| v.title.as_str())
                .collect::<Vec<_>>(),
            ["The Baron in the Trees", "Invisible Cities"]
        );

        let drafts = db
            .find::<Book>()
            .filter(r#""year" IS NULL"#, [])
            .all(&mut connection)
            .await
            .unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].year, None);

        let found = db
            .find::<Author>()
            .filter(r#""name" = ?"#, [Value::from("Italo Calvino")])
            .first(&mut connection)
            .await
            .unwrap();
        assert_eq!(found.id, author.id);
        assert!(found.books.is_empty());
    }
}
