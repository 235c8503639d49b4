use keel::{AsValue, Connection, Db, ErrorExt, ErrorKind, Model, Value};
use rust_decimal::Decimal;
use std::sync::LazyLock;
use time::{Date, PrimitiveDateTime, macros::date, macros::datetime};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Model, Debug, Default, Clone, PartialEq)]
pub struct Author {
    #[keel("column:author_name")]
    pub name: String,
    #[keel("column:author_email")]
    pub email: Option<String>,
}

#[derive(Model, Debug, Default, Clone, PartialEq)]
#[keel(table = "crud_articles")]
pub struct Article {
    #[keel("pk;auto")]
    pub id: i64,
    #[keel("size:120;unique")]
    pub slug: String,
    pub title: String,
    pub body: Option<String>,
    pub views: u32,
    pub rating: f64,
    pub price: Decimal,
    pub published: bool,
    pub external_id: Uuid,
    pub published_on: Option<Date>,
    #[keel("auto_time")]
    pub created_at: Option<PrimitiveDateTime>,
    #[keel("auto_update")]
    pub updated_at: Option<PrimitiveDateTime>,
    #[keel(embed)]
    pub author: Author,
    #[keel(ignore)]
    pub cached: Option<String>,
}

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

fn article(slug: &str, views: u32) -> Article {
    Article {
        slug: slug.into(),
        title: slug.replace('-', " "),
        views,
        rating: 4.5,
        price: Decimal::new(205, 1),
        external_id: Uuid::from_u128(0x6f0c_0a4d_7e0b_4cf5_9d5c_1a2b_3c4d_5e6f + views as u128),
        author: Author {
            name: "Ada".into(),
            email: None,
        },
        ..Default::default()
    }
}

pub async fn crud<C: Connection>(db: &Db, connection: &mut C) {
    let _lock = MUTEX.lock().await;
    db.drop_table::<Article, _>(connection, true)
        .await
        .expect("Failed to drop Article table");
    db.create_table::<Article, _>(connection, false)
        .await
        .expect("Failed to create Article table");

    // Insert and read back
    let mut first = Article {
        body: Some("It's a \"body\"".into()),
        published: true,
        published_on: Some(date!(2024 - 03 - 01)),
        author: Author {
            name: "Grace".into(),
            email: Some("grace@example.com".into()),
        },
        cached: Some("not stored".into()),
        ..article("first-post", 7)
    };
    db.insert(connection, &mut first)
        .await
        .expect("Failed to insert the article");
    assert_ne!(first.id, 0);
    let created_at = first.created_at.expect("created_at was not set");
    assert_eq!(first.updated_at, Some(created_at));

    let mut loaded = db
        .find_by_pk::<Article, _>(connection, first.id)
        .await
        .expect("Failed to find the article");
    assert_eq!(loaded.cached, None);
    loaded.cached = first.cached.clone();
    assert_eq!(loaded, first);
    assert_eq!(loaded.author.email.as_deref(), Some("grace@example.com"));
    assert_eq!(loaded.price, Decimal::new(205, 1));

    // Update restamps only updated_at
    let old = datetime!(2020-01-01 0:00);
    loaded.title = "First post, edited".into();
    loaded.updated_at = Some(old);
    let changed = db
        .update(connection, &mut loaded)
        .await
        .expect("Failed to update the article");
    assert_eq!(changed, 1);
    assert!(loaded.updated_at.is_some_and(|v| v > old));
    assert_eq!(loaded.created_at, Some(created_at));
    let reloaded = db
        .find_by_pk::<Article, _>(connection, first.id)
        .await
        .expect("Failed to find the updated article");
    assert_eq!(reloaded.title, "First post, edited");
    assert_eq!(reloaded.updated_at, loaded.updated_at);

    // Batch insert
    let mut batch = vec![
        article("second", 10),
        article("third", 20),
        article("fourth", 30),
    ];
    let inserted = db
        .insert_many(connection, batch.as_mut_slice())
        .await
        .expect("Failed to insert the batch");
    assert_eq!(inserted, 3);
    assert!(batch.iter().all(|v| v.created_at.is_some()));
    if !db.dialect().supports_returning() {
        assert!(batch.iter().all(|v| v.id == 0), "Ids are only assigned from returned keys");
    }
    assert_eq!(
        db.find::<Article>()
            .count(connection)
            .await
            .expect("Failed to count the articles"),
        4
    );

    // Explicit and generated keys cannot share a batch
    let mut mixed = vec![article("fifth", 1), article("sixth", 2)];
    mixed[0].id = 1000;
    let error = db
        .insert_many(connection, mixed.as_mut_slice())
        .await
        .expect_err("A batch mixing explicit and zero keys must be rejected");
    assert!(
        matches!(ErrorKind::of(&error), Some(ErrorKind::InvalidSql(..))),
        "{error:#}"
    );
    assert_eq!(mixed[1].id, 0);
    assert_eq!(
        db.find::<Article>()
            .count(connection)
            .await
            .expect("Failed to count the articles"),
        4
    );

    // Queries
    let popular = db
        .find::<Article>()
        .filter(r#""views" >= ?"#, [20u32.as_value()])
        .order_by(r#""views" DESC"#)
        .all(connection)
        .await
        .expect("Failed to query the popular articles");
    assert_eq!(
        popular.iter().map(|v| v.slug.as_str()).collect::<Vec<_>>(),
        ["fourth", "third"]
    );
    let page = db
        .find::<Article>()
        .order_by(r#""views""#)
        .limit(2)
        .offset(1)
        .all(connection)
        .await
        .expect("Failed to query a page");
    assert_eq!(
        page.iter().map(|v| v.views).collect::<Vec<_>>(),
        [10, 20]
    );
    let either = db
        .find::<Article>()
        .filter(r#""slug" = ?"#, [Value::from("second")])
        .or_filter(r#""slug" = ?"#, [Value::from("third")])
        .count(connection)
        .await
        .expect("Failed to count with or_filter");
    assert_eq!(either, 2);
    let grouped = db
        .find::<Article>()
        .select([r#""rating""#])
        .group_by([r#""rating""#])
        .having("COUNT(*) > ?", [Value::Int64(Some(1))])
        .all(connection)
        .await
        .expect("Failed to query the groups");
    assert_eq!(grouped.len(), 1);
    assert_eq!(grouped[0].rating, 4.5);
    let found = db
        .find::<Article>()
        .filter(r#""author_name" = ?"#, [Value::from("Grace")])
        .first(connection)
        .await
        .expect("Failed to find by an embedded column");
    assert_eq!(found.id, first.id);

    // Bulk update and delete
    let changed = db
        .find::<Article>()
        .filter(r#""views" < ?"#, [Value::UInt32(Some(25))])
        .update(
            connection,
            [
                ("published", Value::Boolean(Some(true))),
                ("body", Value::Varchar(None)),
            ],
        )
        .await
        .expect("Failed to update many articles");
    assert_eq!(changed, 3);
    let published = db
        .find::<Article>()
        .filter(r#""published" = ?"#, [Value::Boolean(Some(true))])
        .count(connection)
        .await
        .expect("Failed to count the published articles");
    assert_eq!(published, 3);
    let unknown = db
        .find::<Article>()
        .filter(r#""id" > ?"#, [Value::Int64(Some(0))])
        .update(connection, [("missing", Value::Int32(Some(1)))])
        .await
        .expect_err("Updating an unknown column must fail");
    assert!(matches!(unknown.kind(), Some(ErrorKind::InvalidModel(..))));
    let error = db
        .find::<Article>()
        .delete(connection)
        .await
        .expect_err("Delete without a filter must be refused");
    assert!(matches!(error.kind(), Some(ErrorKind::InvalidSql(..))));
    let removed = db
        .find::<Article>()
        .filter(r#""slug" = ?"#, [Value::from("fourth")])
        .delete(connection)
        .await
        .expect("Failed to delete by filter");
    assert_eq!(removed, 1);

    // Delete one record
    let removed = db
        .delete(connection, &mut first)
        .await
        .expect("Failed to delete the article");
    assert_eq!(removed, 1);
    let error = db
        .find_by_pk::<Article, _>(connection, first.id)
        .await
        .expect_err("The article was deleted");
    assert!(error.is_not_found());
    let error = db
        .find::<Article>()
        .filter(r#""views" > ?"#, [Value::UInt32(Some(1000))])
        .first(connection)
        .await
        .expect_err("Nothing has that many views");
    assert_eq!(ErrorKind::of(&error), Some(&ErrorKind::RecordNotFound));
    assert_eq!(
        db.find::<Article>()
            .count(connection)
            .await
            .expect("Failed to count the articles"),
        2
    );
}
