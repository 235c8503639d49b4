use crate::QueryCounter;
use keel::{Connection, Db, ErrorKind, Model, Value};
use rust_decimal::Decimal;
use std::sync::LazyLock;
use tokio::sync::Mutex;

#[derive(Model, Debug, Default, Clone, PartialEq)]
#[keel(table = "shop_users")]
pub struct User {
    pub id: i64,
    #[keel("size:64")]
    pub name: String,
    pub orders: Vec<Order>,
    pub profile: Option<Profile>,
    #[keel("join_table:shop_user_roles")]
    pub roles: Vec<Role>,
}

#[derive(Model, Debug, Default, Clone, PartialEq)]
#[keel(table = "shop_profiles")]
pub struct Profile {
    pub id: i64,
    #[keel("fk:shop_users.id;unique")]
    pub user_id: i64,
    pub bio: String,
}

#[derive(Model, Debug, Default, Clone, PartialEq)]
#[keel(table = "shop_orders")]
pub struct Order {
    pub id: i64,
    #[keel("fk:shop_users.id")]
    pub user_id: i64,
    pub total: i64,
    pub user: Option<Box<User>>,
    #[keel("join_table:shop_order_products")]
    pub products: Vec<Product>,
}

#[derive(Model, Debug, Default, Clone, PartialEq)]
#[keel(table = "shop_products")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
}

#[derive(Model, Debug, Default, Clone, PartialEq)]
#[keel(table = "shop_roles")]
pub struct Role {
    pub id: i64,
    #[keel("unique")]
    pub name: String,
}

#[derive(Model, Debug, Default, Clone, PartialEq)]
#[keel(table = "shop_user_roles")]
pub struct UserRole {
    #[keel("fk:shop_users.id")]
    pub user_id: i64,
    #[keel("fk:shop_roles.id")]
    pub role_id: i64,
}

#[derive(Model, Debug, Default, Clone, PartialEq)]
#[keel(table = "shop_order_products")]
pub struct OrderProduct {
    #[keel("fk:shop_orders.id")]
    pub order_id: i64,
    #[keel("fk:shop_products.id")]
    pub product_id: i64,
}

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

async fn setup<C: Connection>(db: &Db, connection: &mut C) {
    // Children first, the foreign keys are enforced
    db.drop_table::<OrderProduct, _>(connection, true)
        .await
        .expect("Failed to drop OrderProduct table");
    db.drop_table::<UserRole, _>(connection, true)
        .await
        .expect("Failed to drop UserRole table");
    db.drop_table::<Order, _>(connection, true)
        .await
        .expect("Failed to drop Order table");
    db.drop_table::<Profile, _>(connection, true)
        .await
        .expect("Failed to drop Profile table");
    db.drop_table::<Product, _>(connection, true)
        .await
        .expect("Failed to drop Product table");
    db.drop_table::<Role, _>(connection, true)
        .await
        .expect("Failed to drop Role table");
    db.drop_table::<User, _>(connection, true)
        .await
        .expect("Failed to drop User table");

    db.create_table::<User, _>(connection, true)
        .await
        .expect("Failed to create User table");
    db.create_table::<Role, _>(connection, true)
        .await
        .expect("Failed to create Role table");
    db.create_table::<Product, _>(connection, true)
        .await
        .expect("Failed to create Product table");
    db.create_table::<Profile, _>(connection, true)
        .await
        .expect("Failed to create Profile table");
    db.create_table::<Order, _>(connection, true)
        .await
        .expect("Failed to create Order table");
    db.create_table::<UserRole, _>(connection, true)
        .await
        .expect("Failed to create UserRole table");
    db.create_table::<OrderProduct, _>(connection, true)
        .await
        .expect("Failed to create OrderProduct table");
}

fn user(name: &str) -> User {
    User {
        name: name.into(),
        ..Default::default()
    }
}

pub async fn shop<C: Connection>(db: &Db, connection: &mut C) {
    let _lock = MUTEX.lock().await;
    setup(db, connection).await;

    let mut alice = user("alice");
    let mut bob = user("bob");
    db.insert(connection, &mut alice)
        .await
        .expect("Failed to insert alice");
    db.insert(connection, &mut bob)
        .await
        .expect("Failed to insert bob");
    assert_ne!(alice.id, 0, "The generated id was not assigned");
    assert_ne!(alice.id, bob.id);

    let mut orders = Vec::new();
    for total in [50, 120, 300] {
        let mut order = Order {
            user_id: alice.id,
            total,
            ..Default::default()
        };
        db.insert(connection, &mut order)
            .await
            .expect("Failed to insert an order");
        orders.push(order);
    }

    let mut products = Vec::new();
    for (name, price) in [
        ("keyboard", Decimal::new(4950, 2)),
        ("mouse", Decimal::new(1925, 2)),
        ("screen", Decimal::new(21000, 2)),
    ] {
        let mut product = Product {
            name: name.into(),
            price,
            ..Default::default()
        };
        db.insert(connection, &mut product)
            .await
            .expect("Failed to insert a product");
        products.push(product);
    }
    let mut links = vec![
        OrderProduct {
            order_id: orders[0].id,
            product_id: products[0].id,
        },
        OrderProduct {
            order_id: orders[0].id,
            product_id: products[1].id,
        },
    ];
    let inserted = db
        .insert_many(connection, links.as_mut_slice())
        .await
        .expect("Failed to link orders and products");
    assert_eq!(inserted, 2);

    let mut roles = Vec::new();
    for name in ["admin", "editor", "viewer"] {
        let mut role = Role {
            name: name.into(),
            ..Default::default()
        };
        db.insert(connection, &mut role)
            .await
            .expect("Failed to insert a role");
        roles.push(role);
    }
    let mut grants = roles
        .iter()
        .map(|role| UserRole {
            user_id: alice.id,
            role_id: role.id,
        })
        .chain([
            UserRole {
                user_id: bob.id,
                role_id: roles[2].id,
            },
            // Granted twice, still one role
            UserRole {
                user_id: bob.id,
                role_id: roles[2].id,
            },
        ])
        .collect::<Vec<_>>();
    db.insert_many(connection, grants.as_mut_slice())
        .await
        .expect("Failed to grant the roles");

    let mut profile = Profile {
        user_id: alice.id,
        bio: "Buys keyboards".into(),
        ..Default::default()
    };
    db.insert(connection, &mut profile)
        .await
        .expect("Failed to insert the profile");

    // Has many, one extra query for every parent
    {
        let mut counter = QueryCounter::new(&mut *connection);
        let users = db
            .find::<User>()
            .order_by(r#""id""#)
            .preload("orders")
            .all(&mut counter)
            .await
            .expect("Failed to load the users with their orders");
        assert_eq!(counter.fetches(), 2);
        assert_eq!(users.len(), 2);
        let (loaded_alice, loaded_bob) = (&users[0], &users[1]);
        assert_eq!(loaded_alice.name, "alice");
        assert_eq!(loaded_alice.orders.len(), 3);
        assert!(loaded_alice.orders.iter().all(|v| v.user_id == alice.id));
        let mut totals = loaded_alice.orders.iter().map(|v| v.total).collect::<Vec<_>>();
        totals.sort();
        assert_eq!(totals, [50, 120, 300]);
        assert!(loaded_bob.orders.is_empty());
        assert!(loaded_alice.roles.is_empty(), "Roles were not requested");
    }

    // Belongs to
    {
        let mut counter = QueryCounter::new(&mut *connection);
        let loaded = db
            .find::<Order>()
            .preload("user")
            .all(&mut counter)
            .await
            .expect("Failed to load the orders with their user");
        assert_eq!(counter.fetches(), 2);
        assert_eq!(loaded.len(), 3);
        for order in &loaded {
            let owner = order.user.as_ref().expect("The order has no user");
            assert_eq!(owner.id, order.user_id);
            assert_eq!(owner.name, "alice");
        }
    }

    // Preloading values already in memory
    {
        let mut loaded = db
            .find::<Order>()
            .filter(r#""total" > ?"#, [Value::Int64(Some(100))])
            .all(connection)
            .await
            .expect("Failed to load the big orders");
        assert_eq!(loaded.len(), 2);
        assert!(loaded.iter().all(|v| v.user.is_none()));
        db.preload(connection, loaded.as_mut_slice(), "user")
            .await
            .expect("Failed to preload the user");
        assert!(
            loaded
                .iter()
                .all(|v| v.user.as_ref().is_some_and(|u| u.id == alice.id))
        );
    }

    // Many to many, a join table query and a target query
    {
        let mut counter = QueryCounter::new(&mut *connection);
        let users = db
            .find::<User>()
            .order_by(r#""id""#)
            .preload("roles")
            .all(&mut counter)
            .await
            .expect("Failed to load the users with their roles");
        assert_eq!(counter.fetches(), 3);
        let mut names = users[0]
            .roles
            .iter()
            .map(|v| v.name.as_str())
            .collect::<Vec<_>>();
        names.sort();
        assert_eq!(names, ["admin", "editor", "viewer"]);
        let mut ids = users[0].roles.iter().map(|v| v.id).collect::<Vec<_>>();
        ids.dedup();
        assert_eq!(ids.len(), 3);
        // Shared with alice
        assert_eq!(users[1].roles.len(), 1);
        assert_eq!(users[1].roles[0].name, "viewer");
    }

    // Has one
    {
        let users = db
            .find::<User>()
            .order_by(r#""id""#)
            .preload("profile")
            .all(connection)
            .await
            .expect("Failed to load the users with their profile");
        assert_eq!(
            users[0].profile.as_ref().map(|v| v.bio.as_str()),
            Some("Buys keyboards")
        );
        assert_eq!(users[1].profile, None);
    }

    // Empty IN matches nothing and the preload sends nothing
    {
        let mut counter = QueryCounter::new(&mut *connection);
        let users = db
            .find::<User>()
            .filter_in(r#""id""#, Vec::<Value>::new())
            .preload("orders")
            .all(&mut counter)
            .await
            .expect("An empty IN must not fail");
        assert!(users.is_empty());
        assert_eq!(counter.fetches(), 1);
    }

    // Nested, the two paths share the orders level
    {
        let mut counter = QueryCounter::new(&mut *connection);
        let users = db
            .find::<User>()
            .filter(r#""id" = ?"#, [Value::Int64(Some(alice.id))])
            .preload("orders")
            .preload("orders.products")
            .all(&mut counter)
            .await
            .expect("Failed to load the nested associations");
        assert_eq!(counter.fetches(), 4);
        assert_eq!(users.len(), 1);
        let first = users[0]
            .orders
            .iter()
            .find(|v| v.id == orders[0].id)
            .expect("The first order is missing");
        assert_eq!(first.products.len(), 2);
        let mut prices = first.products.iter().map(|v| v.price).collect::<Vec<_>>();
        prices.sort();
        assert_eq!(prices, [Decimal::new(1925, 2), Decimal::new(4950, 2)]);
        assert!(
            users[0]
                .orders
                .iter()
                .filter(|v| v.id != orders[0].id)
                .all(|v| v.products.is_empty())
        );
    }

    // Refined level
    {
        let users = db
            .find::<User>()
            .filter(r#""name" = ?"#, [Value::from("alice")])
            .preload_with("orders", |builder| {
                builder
                    .filter(r#""total" >= ?"#, [Value::Int64(Some(120))])
                    .order_by(r#""total" DESC"#);
            })
            .all(connection)
            .await
            .expect("Failed to load the refined orders");
        let totals = users[0].orders.iter().map(|v| v.total).collect::<Vec<_>>();
        assert_eq!(totals, [300, 120]);
    }

    // Aliased refinements
    {
        let users = db
            .find::<User>()
            .order_by(r#""id""#)
            .preload_with("orders", |builder| {
                builder
                    .alias("o")
                    .filter(r#"o."total" < ?"#, [Value::Int64(Some(300))])
                    .order_by(r#"o."total""#);
            })
            .preload_with("roles", |builder| {
                builder.alias("r").order_by(r#"r."name" DESC"#);
            })
            .all(connection)
            .await
            .expect("Failed to load the aliased associations");
        let totals = users[0].orders.iter().map(|v| v.total).collect::<Vec<_>>();
        assert_eq!(totals, [50, 120]);
        let names = users[0]
            .roles
            .iter()
            .map(|v| v.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, ["viewer", "editor", "admin"]);
        assert_eq!(users[1].roles.len(), 1);
    }

    // Unknown association
    {
        let error = db
            .find::<User>()
            .preload("wishlist")
            .all(connection)
            .await
            .expect_err("Preloading an unknown association must fail");
        assert_eq!(
            ErrorKind::of(&error),
            Some(&ErrorKind::RelationNotFound {
                model: "User".into(),
                relation: "wishlist".into(),
            })
        );
    }

    // Unknown associations fail even when there is nothing to load
    {
        let error = db
            .find::<User>()
            .filter_in(r#""id""#, Vec::<Value>::new())
            .preload("wishlist")
            .all(connection)
            .await
            .expect_err("An unknown association must fail without parents");
        assert_eq!(
            ErrorKind::of(&error),
            Some(&ErrorKind::RelationNotFound {
                model: "User".into(),
                relation: "wishlist".into(),
            })
        );

        // Bob has no orders, the nested segment is checked anyway
        let error = db
            .find::<User>()
            .filter(r#""name" = ?"#, [Value::from("bob")])
            .preload("orders.coupons")
            .all(connection)
            .await
            .expect_err("An unknown nested association must fail");
        assert_eq!(
            ErrorKind::of(&error),
            Some(&ErrorKind::RelationNotFound {
                model: "Order".into(),
                relation: "coupons".into(),
            })
        );

        let error = db
            .preload(connection, Vec::<Order>::new().as_mut_slice(), "buyer")
            .await
            .expect_err("Preloading no values still checks the path");
        assert!(
            matches!(
                ErrorKind::of(&error),
                Some(ErrorKind::RelationNotFound { .. })
            ),
            "{error:#}"
        );
    }

    // Repeated select and filter keep every column and condition
    {
        let users = db
            .find::<User>()
            .select([r#""id""#])
            .filter(r#""id" > ?"#, [Value::Int64(Some(0))])
            .select([r#""name""#])
            .filter(r#""name" <> ?"#, [Value::from("bob")])
            .all(connection)
            .await
            .expect("Failed to load the selected columns");
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, alice.id);
        assert_eq!(users[0].name, "alice");
    }
}
