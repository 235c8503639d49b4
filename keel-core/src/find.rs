use crate::{
    AsValue, Db, ErrorKind, Executor, Model, ModelMeta, PooledBuilder, PreloadTree, Record,
    Refinement, Result, SqlBuilder, Statement, Value, preload::{load_level, resolve_tree},
};
use std::{collections::BTreeMap, marker::PhantomData, sync::Arc};

/// Typed query over the table of `T`, created by [`Db::find`].
///
/// Clause methods take and return the query by value so they chain, the terminal methods send
/// it. Fragments use `?` as placeholder whatever the backend.
pub struct Find<'d, T: Model> {
    db: &'d Db,
    builder: PooledBuilder<'d>,
    preloads: PreloadTree,
    phantom: PhantomData<fn() -> T>,
}

impl<'d, T: Model> Find<'d, T> {
    pub(crate) fn new(db: &'d Db) -> Self {
        Self {
            db,
            builder: db.builders().acquire(),
            preloads: Default::default(),
            phantom: PhantomData,
        }
    }

    pub fn select<S: AsRef<str>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.builder.select(columns);
        self
    }

    pub fn filter(mut self, condition: &str, args: impl IntoIterator<Item = Value>) -> Self {
        self.builder.filter(condition, args);
        self
    }

    pub fn or_filter(mut self, condition: &str, args: impl IntoIterator<Item = Value>) -> Self {
        self.builder.or_filter(condition, args);
        self
    }

    pub fn filter_in(mut self, column: &str, values: impl IntoIterator<Item = Value>) -> Self {
        self.builder.filter_in(column, values);
        self
    }

    pub fn join(mut self, clause: &str) -> Self {
        self.builder.join(clause);
        self
    }

    pub fn group_by<S: AsRef<str>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.builder.group_by(columns);
        self
    }

    pub fn having(mut self, condition: &str, args: impl IntoIterator<Item = Value>) -> Self {
        self.builder.having(condition, args);
        self
    }

    pub fn order_by(mut self, order: &str) -> Self {
        self.builder.order_by(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.builder.limit(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.builder.offset(offset);
        self
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.builder.alias(alias);
        self
    }

    /// Loads the association at the dot separated `path` together with the results.
    pub fn preload(mut self, path: &str) -> Self {
        self.preloads.insert(path, None);
        self
    }

    /// Same as [`Find::preload`], `refine` adds clauses to the query loading the last segment.
    pub fn preload_with(
        mut self,
        path: &str,
        refine: impl Fn(&mut SqlBuilder) + Send + Sync + 'static,
    ) -> Self {
        self.preloads.insert(path, Some(Arc::new(refine) as Refinement));
        self
    }

    fn model(&mut self) -> Result<Arc<ModelMeta>> {
        let meta = self.db.registry().model::<T>()?;
        self.builder.table(&meta.table);
        Ok(meta)
    }

    /// The SELECT this query would send.
    pub fn to_statement(&mut self) -> Result<Statement> {
        self.model()?;
        self.builder.render_select(self.db.dialect())
    }

    pub async fn all<E: Executor>(mut self, executor: &mut E) -> Result<Vec<T>> {
        let meta = self.model()?;
        resolve_tree(self.db, &meta, &self.preloads)?;
        let statement = self.builder.render_select(self.db.dialect())?;
        let rows = self.db.fetch(executor, &statement).await?;
        let mut records = self.db.scanner().scan_all::<T>(&meta, &rows)?;
        if !self.preloads.is_empty() && !records.is_empty() {
            let parents = records.iter_mut().map(|v| v as &mut dyn Record).collect();
            load_level(self.db, executor, meta, parents, &self.preloads).await?;
        }
        for record in records.iter_mut() {
            if let Some(hooks) = record.hooks() {
                hooks.after_find()?;
            }
        }
        Ok(records)
    }

    /// The first matching record, `RecordNotFound` when there is none.
    pub async fn first<E: Executor>(self, executor: &mut E) -> Result<T> {
        self.limit(1)
            .all(executor)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ErrorKind::RecordNotFound.into())
    }

    pub async fn count<E: Executor>(mut self, executor: &mut E) -> Result<u64> {
        self.model()?;
        let statement = self.builder.render_count(self.db.dialect())?;
        let row = self.db.fetch_one(executor, &statement).await?;
        match row.and_then(|v| v.values.into_vec().into_iter().next()) {
            Some(value) => u64::try_from_value(value),
            None => Ok(0),
        }
    }

    /// Sets the given columns on every matching row, returns the number of rows changed.
    pub async fn update<E, K>(
        mut self,
        executor: &mut E,
        assignments: impl IntoIterator<Item = (K, Value)>,
    ) -> Result<u64>
    where
        E: Executor,
        K: Into<String>,
    {
        let meta = self.model()?;
        let assignments = assignments
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect::<BTreeMap<String, Value>>();
        for column in assignments.keys() {
            meta.require_column(column)?;
        }
        let statement = self
            .builder
            .render_update(self.db.dialect(), &assignments)?;
        Ok(self.db.execute(executor, &statement).await?.rows_affected)
    }

    /// Deletes every matching row, refused when no filter was given.
    pub async fn delete<E: Executor>(mut self, executor: &mut E) -> Result<u64> {
        self.model()?;
        let statement = self.builder.render_delete(self.db.dialect())?;
        Ok(self.db.execute(executor, &statement).await?.rows_affected)
    }
}
