use crate::{
    AsValue, BuilderPool, Config, Context, Dialect, DialectRegistry, ErrorKind, Executor, Field,
    FieldType, Find, Model, ModelMeta, PreloadTree, Record, Registry, RelationCatalog, Result,
    RowLabeled, RowsAffected, Scanner, Statement, Value, builder::bind_placeholders,
    preload::{load_level, resolve_tree},
};
use std::{collections::BTreeMap, sync::Arc};
use time::{OffsetDateTime, PrimitiveDateTime};

/// Entry point of the library: the dialect, model registry, relation catalog, scan plan cache
/// and builder pool shared by every operation.
///
/// A `Db` holds no connection. Each operation takes the [`Executor`] to run on, a connection or a
/// transaction.
pub struct Db {
    config: Config,
    dialect: Arc<dyn Dialect>,
    registry: Arc<Registry>,
    relations: RelationCatalog,
    scanner: Scanner,
    builders: BuilderPool,
}

impl Db {
    pub fn new(config: Config) -> Result<Self> {
        Self::with_dialects(config, &DialectRegistry::with_defaults())
    }

    pub fn with_dialects(config: Config, dialects: &DialectRegistry) -> Result<Self> {
        let dialect = dialects.get(&config.dialect)?;
        let registry = Arc::new(Registry::new());
        log::debug!(
            "Created a db using the `{}` dialect (builder pool of {})",
            dialect.name(),
            config.builder_pool_size
        );
        Ok(Self {
            dialect,
            relations: RelationCatalog::new(registry.clone()),
            registry,
            scanner: Scanner::new(),
            builders: BuilderPool::new(config.builder_pool_size),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
    pub fn relations(&self) -> &RelationCatalog {
        &self.relations
    }
    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }
    pub fn builders(&self) -> &BuilderPool {
        &self.builders
    }

    pub async fn fetch<E: Executor>(
        &self,
        executor: &mut E,
        statement: &Statement,
    ) -> Result<Vec<RowLabeled>> {
        log::debug!("{statement} ({} arguments)", statement.args.len());
        executor
            .fetch(statement)
            .await
            .with_context(|| format!("While executing the query:\n{statement}"))
    }

    pub async fn fetch_one<E: Executor>(
        &self,
        executor: &mut E,
        statement: &Statement,
    ) -> Result<Option<RowLabeled>> {
        log::debug!("{statement} ({} arguments)", statement.args.len());
        executor
            .fetch_one(statement)
            .await
            .with_context(|| format!("While executing the query:\n{statement}"))
    }

    pub async fn execute<E: Executor>(
        &self,
        executor: &mut E,
        statement: &Statement,
    ) -> Result<RowsAffected> {
        log::debug!("{statement} ({} arguments)", statement.args.len());
        executor
            .execute(statement)
            .await
            .with_context(|| format!("While executing the query:\n{statement}"))
    }

    pub fn find<T: Model>(&self) -> Find<'_, T> {
        Find::new(self)
    }

    /// The record whose primary key equals `key`, `RecordNotFound` when there is none.
    pub async fn find_by_pk<T: Model, E: Executor>(
        &self,
        executor: &mut E,
        key: impl Into<Value>,
    ) -> Result<T> {
        let meta = self.registry.model::<T>()?;
        let pk = meta.require_primary_key()?;
        let condition = format!("{} = ?", self.dialect.quoted(&pk.column));
        self.find::<T>()
            .filter(&condition, [key.into()])
            .first(executor)
            .await
    }

    /// Inserts one record.
    ///
    /// A zero auto increment key is left to the database and written back from RETURNING, or from
    /// the last insert id when the dialect has no RETURNING. Zero `auto_time` / `auto_update`
    /// fields are set to the current time first.
    pub async fn insert<T: Model, E: Executor>(&self, executor: &mut E, record: &mut T) -> Result<()> {
        let meta = self.registry.model::<T>()?;
        if let Some(hooks) = record.hooks() {
            hooks.before_insert()?;
        }
        stamp_times(&meta, record, false)?;
        let (columns, values, generated) = insert_values(&meta, [&*record])?;
        let returning = generated
            .filter(|_| self.dialect.supports_returning())
            .map(|pk| pk.column.as_str());
        let mut sql = String::with_capacity(128);
        self.dialect
            .write_insert(&mut sql, &meta.table, &columns, 1, returning);
        let statement = bind_placeholders(self.dialect(), &sql, values)?;
        match generated {
            Some(pk) if returning.is_some() => {
                let row = self.fetch_one(executor, &statement).await?;
                if let Some(value) = row.and_then(|v| v.values.into_vec().into_iter().next()) {
                    pk.set(record, value)?;
                }
            }
            Some(pk) => {
                let result = self.execute(executor, &statement).await?;
                if let Some(id) = result.last_affected_id {
                    pk.set(record, Value::Int64(Some(id)))?;
                }
            }
            None => {
                self.execute(executor, &statement).await?;
            }
        }
        if let Some(hooks) = record.hooks() {
            hooks
                .after_insert()
                .context("The record was inserted but the after_insert hook failed")?;
        }
        Ok(())
    }

    /// Inserts many records with one statement, returns the number of rows inserted.
    ///
    /// Generated keys are written back only when the dialect supports RETURNING, ids are never
    /// guessed from a last insert id.
    pub async fn insert_many<T: Model, E: Executor>(
        &self,
        executor: &mut E,
        records: &mut [T],
    ) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }
        let meta = self.registry.model::<T>()?;
        for record in records.iter_mut() {
            if let Some(hooks) = record.hooks() {
                hooks.before_insert()?;
            }
            stamp_times(&meta, record, false)?;
        }
        let (columns, values, generated) = insert_values(&meta, records.iter())?;
        let returning = generated
            .filter(|_| self.dialect.supports_returning())
            .map(|pk| pk.column.as_str());
        let mut sql = String::with_capacity(128);
        self.dialect
            .write_insert(&mut sql, &meta.table, &columns, records.len(), returning);
        let statement = bind_placeholders(self.dialect(), &sql, values)?;
        let inserted = match generated {
            Some(pk) if returning.is_some() => {
                let rows = self.fetch(executor, &statement).await?;
                if rows.len() == records.len() {
                    for (record, row) in records.iter_mut().zip(rows.iter()) {
                        if let Some(value) = row.values.first() {
                            pk.set(record, value.clone())?;
                        }
                    }
                } else {
                    log::warn!(
                        "Inserted {} rows into `{}` but received {} generated keys, keys not assigned",
                        records.len(),
                        meta.table,
                        rows.len()
                    );
                }
                rows.len() as u64
            }
            _ => self.execute(executor, &statement).await?.rows_affected,
        };
        for record in records.iter_mut() {
            if let Some(hooks) = record.hooks() {
                hooks
                    .after_insert()
                    .context("The records were inserted but an after_insert hook failed")?;
            }
        }
        Ok(inserted)
    }

    /// Writes every non key column of `record`, returns the number of rows changed.
    pub async fn update<T: Model, E: Executor>(&self, executor: &mut E, record: &mut T) -> Result<u64> {
        let meta = self.registry.model::<T>()?;
        let pk = meta.require_primary_key()?;
        if let Some(hooks) = record.hooks() {
            hooks.before_update()?;
        }
        stamp_times(&meta, record, true)?;
        let mut assignments = BTreeMap::new();
        for field in meta.fields.iter().filter(|v| !v.primary_key) {
            assignments.insert(field.column.clone(), field.get(record)?);
        }
        let statement = {
            let mut builder = self.builders.acquire();
            let condition = format!("{} = ?", self.dialect.quoted(&pk.column));
            builder
                .table(&meta.table)
                .filter(&condition, [pk.get(record)?]);
            builder.render_update(self.dialect(), &assignments)?
        };
        let affected = self.execute(executor, &statement).await?.rows_affected;
        if let Some(hooks) = record.hooks() {
            hooks
                .after_update()
                .context("The record was updated but the after_update hook failed")?;
        }
        Ok(affected)
    }

    /// Deletes the row of `record` by primary key, returns the number of rows removed.
    pub async fn delete<T: Model, E: Executor>(&self, executor: &mut E, record: &mut T) -> Result<u64> {
        let meta = self.registry.model::<T>()?;
        let pk = meta.require_primary_key()?;
        if let Some(hooks) = record.hooks() {
            hooks.before_delete()?;
        }
        let statement = {
            let mut builder = self.builders.acquire();
            let condition = format!("{} = ?", self.dialect.quoted(&pk.column));
            builder
                .table(&meta.table)
                .filter(&condition, [pk.get(record)?]);
            builder.render_delete(self.dialect())?
        };
        let affected = self.execute(executor, &statement).await?.rows_affected;
        if let Some(hooks) = record.hooks() {
            hooks
                .after_delete()
                .context("The record was deleted but the after_delete hook failed")?;
        }
        Ok(affected)
    }

    /// Loads the association at `path` into records that were already fetched.
    pub async fn preload<T: Model, E: Executor>(
        &self,
        executor: &mut E,
        records: &mut [T],
        path: &str,
    ) -> Result<()> {
        let meta = self.registry.model::<T>()?;
        let mut tree = PreloadTree::new();
        tree.insert(path, None);
        resolve_tree(self, &meta, &tree)?;
        if records.is_empty() {
            return Ok(());
        }
        let parents = records.iter_mut().map(|v| v as &mut dyn Record).collect();
        load_level(self, executor, meta, parents, &tree).await
    }

    pub async fn create_table<T: Model, E: Executor>(
        &self,
        executor: &mut E,
        if_not_exists: bool,
    ) -> Result<()> {
        let meta = self.registry.model::<T>()?;
        let mut sql = String::with_capacity(256);
        self.dialect
            .write_create_table(&mut sql, &meta, if_not_exists);
        self.execute(executor, &sql.into()).await?;
        Ok(())
    }

    pub async fn drop_table<T: Model, E: Executor>(
        &self,
        executor: &mut E,
        if_exists: bool,
    ) -> Result<()> {
        let meta = self.registry.model::<T>()?;
        let mut sql = String::with_capacity(64);
        self.dialect.write_drop_table(&mut sql, &meta.table, if_exists);
        self.execute(executor, &sql.into()).await?;
        Ok(())
    }

    /// Adds the column of `T` named `column` to its existing table.
    pub async fn add_column<T: Model, E: Executor>(
        &self,
        executor: &mut E,
        column: &str,
    ) -> Result<()> {
        let meta = self.registry.model::<T>()?;
        let field = meta.require_column(column)?;
        let mut sql = String::with_capacity(128);
        self.dialect.write_add_column(&mut sql, &meta.table, field);
        self.execute(executor, &sql.into()).await?;
        Ok(())
    }

    pub async fn table_exists<E: Executor>(&self, executor: &mut E, table: &str) -> Result<bool> {
        let mut sql = String::with_capacity(128);
        self.dialect.write_table_exists(&mut sql);
        let statement = bind_placeholders(self.dialect(), &sql, vec![table.into()])?;
        let row = self.fetch_one(executor, &statement).await?;
        Ok(match row.and_then(|v| v.values.into_vec().into_iter().next()) {
            Some(value) => i64::try_from_value(value)? > 0,
            None => false,
        })
    }

    /// Column names of `table` as the database reports them.
    pub async fn columns<E: Executor>(&self, executor: &mut E, table: &str) -> Result<Vec<String>> {
        let mut sql = String::with_capacity(128);
        self.dialect.write_columns_query(&mut sql);
        let statement = bind_placeholders(self.dialect(), &sql, vec![table.into()])?;
        self.fetch(executor, &statement)
            .await?
            .into_iter()
            .filter_map(|row| row.values.into_vec().into_iter().next())
            .map(String::try_from_value)
            .collect()
    }
}

/// Columns and flattened values of an INSERT, plus the key left to the database.
///
/// The auto increment key is omitted when it is zero in every record. A batch mixing zero and
/// explicit keys is rejected, one statement cannot both write and omit a column.
fn insert_values<'m, 'r, T: Model>(
    meta: &'m ModelMeta,
    records: impl IntoIterator<Item = &'r T> + Clone,
) -> Result<(Vec<&'m str>, Vec<Value>, Option<&'m Field>)> {
    let mut generated = None;
    if let Some(pk) = meta.primary_key().filter(|v| v.auto_increment) {
        let (mut zero, mut explicit) = (0usize, 0usize);
        for record in records.clone() {
            if pk.get(record)?.is_zero() {
                zero += 1;
            } else {
                explicit += 1;
            }
        }
        if zero > 0 && explicit > 0 {
            return Err(ErrorKind::invalid_sql(format!(
                "Cannot insert into `{}` a batch mixing generated and explicit `{}` keys ({zero} generated, {explicit} explicit)",
                meta.table, pk.column
            )));
        }
        if explicit == 0 {
            generated = Some(pk);
        }
    }
    let fields = meta
        .fields
        .iter()
        .filter(|v| !generated.is_some_and(|pk: &Field| pk.column == v.column))
        .collect::<Vec<_>>();
    let mut values = Vec::new();
    for record in records {
        for field in &fields {
            values.push(field.get(record)?);
        }
    }
    Ok((
        fields.iter().map(|v| v.column.as_str()).collect(),
        values,
        generated,
    ))
}

/// Sets `auto_update` fields, and the zero `auto_time` fields when inserting.
fn stamp_times(meta: &ModelMeta, record: &mut dyn Record, updating: bool) -> Result<()> {
    let now = OffsetDateTime::now_utc();
    // Stored timestamps keep microseconds
    let now = now
        .replace_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now);
    for field in meta.fields.iter() {
        let stamp = if updating {
            field.auto_update
        } else {
            (field.auto_time || field.auto_update) && field.get(record)?.is_zero()
        };
        if !stamp {
            continue;
        }
        match now_value(field.ty, now) {
            Some(value) => field.set(record, value)?,
            None => log::warn!(
                "Field `{}.{}` of type {:?} cannot hold an automatic timestamp",
                meta.type_name,
                field.name,
                field.ty
            ),
        }
    }
    Ok(())
}

fn now_value(ty: FieldType, now: OffsetDateTime) -> Option<Value> {
    Some(match ty {
        FieldType::Timestamp => Value::Timestamp(Some(PrimitiveDateTime::new(now.date(), now.time()))),
        FieldType::TimestampWithTimezone => Value::TimestampWithTimezone(Some(now)),
        FieldType::Date => Value::Date(Some(now.date())),
        FieldType::Int64 => Value::Int64(Some(now.unix_timestamp())),
        FieldType::UInt64 => u64::try_from(now.unix_timestamp()).ok().as_value(),
        _ => return None,
    })
}
