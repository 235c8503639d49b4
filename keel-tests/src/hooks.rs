use keel::{Connection, Db, Error, Hooks, Model, Result, Value};
use std::sync::LazyLock;
use tokio::sync::Mutex;

#[derive(Model, Debug, Default, Clone, PartialEq)]
#[keel(table = "hook_accounts", hooks)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub balance: i64,
    #[keel(ignore)]
    pub events: Vec<String>,
}

impl Hooks for Account {
    fn before_insert(&mut self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::msg("An account needs a name"));
        }
        self.name = self.name.trim().to_string();
        self.events.push("before_insert".into());
        Ok(())
    }

    fn after_insert(&mut self) -> Result<()> {
        self.events.push("after_insert".into());
        Ok(())
    }

    fn before_update(&mut self) -> Result<()> {
        if self.balance < 0 {
            return Err(Error::msg(format!(
                "Account `{}` cannot go below zero",
                self.name
            )));
        }
        self.events.push("before_update".into());
        Ok(())
    }

    fn after_update(&mut self) -> Result<()> {
        self.events.push("after_update".into());
        Ok(())
    }

    fn before_delete(&mut self) -> Result<()> {
        self.events.push("before_delete".into());
        Ok(())
    }

    fn after_find(&mut self) -> Result<()> {
        self.events.push("after_find".into());
        Ok(())
    }
}

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn hooks<C: Connection>(db: &Db, connection: &mut C) {
    let _lock = MUTEX.lock().await;
    db.drop_table::<Account, _>(connection, true)
        .await
        .expect("Failed to drop Account table");
    db.create_table::<Account, _>(connection, false)
        .await
        .expect("Failed to create Account table");

    // Rejected before anything is written
    let mut nameless = Account {
        name: "   ".into(),
        balance: 10,
        ..Default::default()
    };
    let error = db
        .insert(connection, &mut nameless)
        .await
        .expect_err("An empty name must be rejected");
    assert!(format!("{error:#}").contains("An account needs a name"));
    assert!(nameless.events.is_empty());
    assert_eq!(
        db.find::<Account>()
            .count(connection)
            .await
            .expect("Failed to count the accounts"),
        0
    );

    let mut account = Account {
        name: "  savings ".into(),
        balance: 100,
        ..Default::default()
    };
    db.insert(connection, &mut account)
        .await
        .expect("Failed to insert the account");
    assert_eq!(account.events, ["before_insert", "after_insert"]);
    assert_eq!(account.name, "savings");

    let loaded = db
        .find_by_pk::<Account, _>(connection, account.id)
        .await
        .expect("Failed to find the account");
    assert_eq!(loaded.name, "savings");
    assert_eq!(loaded.events, ["after_find"]);

    account.events.clear();
    account.balance = -5;
    db.update(connection, &mut account)
        .await
        .expect_err("A negative balance must be rejected");
    assert!(account.events.is_empty());
    let stored = db
        .find::<Account>()
        .filter(r#""id" = ?"#, [Value::Int64(Some(account.id))])
        .first(connection)
        .await
        .expect("Failed to find the account");
    assert_eq!(stored.balance, 100);

    account.balance = 60;
    db.update(connection, &mut account)
        .await
        .expect("Failed to update the account");
    assert_eq!(account.events, ["before_update", "after_update"]);

    account.events.clear();
    db.delete(connection, &mut account)
        .await
        .expect("Failed to delete the account");
    assert_eq!(account.events, ["before_delete"]);
}
