mod constraints;
mod crud;
mod hooks;
mod scan;
mod schema;
mod shop;
mod transaction1;

use crate::{
    constraints::constraints, crud::crud, hooks::hooks, scan::scan, schema::schema, shop::shop,
    transaction1::transaction1,
};
use keel::{Config, Connection, Db, Executor, Result, RowLabeled, RowsAffected, Statement};
use log::LevelFilter;
use std::env;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

pub async fn execute_tests<C: Connection>(config: Config, mut connection: C) {
    let db = Db::new(config).expect("Could not create the db");
    crud(&db, &mut connection).await;
    shop(&db, &mut connection).await;
    hooks(&db, &mut connection).await;
    constraints(&db, &mut connection).await;
    schema(&db, &mut connection).await;
    scan(&db, &mut connection).await;
    transaction1(&db, &mut connection).await;
}

/// Forwards every statement to another executor, counting them.
pub struct QueryCounter<'e, E> {
    executor: &'e mut E,
    fetches: usize,
    executions: usize,
}

impl<'e, E: Executor> QueryCounter<'e, E> {
    pub fn new(executor: &'e mut E) -> Self {
        Self {
            executor,
            fetches: 0,
            executions: 0,
        }
    }

    /// Statements sent through `fetch` or `fetch_one`.
    pub fn fetches(&self) -> usize {
        self.fetches
    }

    pub fn executions(&self) -> usize {
        self.executions
    }
}

impl<E: Executor> Executor for QueryCounter<'_, E> {
    async fn fetch(&mut self, statement: &Statement) -> Result<Vec<RowLabeled>> {
        self.fetches += 1;
        self.executor.fetch(statement).await
    }

    async fn execute(&mut self, statement: &Statement) -> Result<RowsAffected> {
        self.executions += 1;
        self.executor.execute(statement).await
    }
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
