use crate::{
    Dialect, ErrorKind, Result, Statement, Value, is_plain_identifier, separated_by, unpoison,
};
use std::{
    collections::BTreeMap,
    mem,
    ops::{Deref, DerefMut},
    sync::Mutex,
};

/// Tokens that would let a join clause smuggle a second statement or hide the rest of the query.
const FORBIDDEN_IN_JOIN: [&str; 4] = [";", "--", "/*", "*/"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    And,
    Or,
}

impl Combinator {
    fn keyword(self) -> &'static str {
        match self {
            Combinator::And => " AND ",
            Combinator::Or => " OR ",
        }
    }
}

/// Clause accumulator for one statement.
///
/// Fragments are raw SQL written with `?` as the placeholder, the dialect specific placeholders are
/// only produced at render time. Errors found while configuring (an unsafe join) are kept and
/// reported by the render methods.
#[derive(Debug, Default)]
pub struct SqlBuilder {
    table: String,
    alias: Option<String>,
    columns: Vec<String>,
    joins: Vec<String>,
    predicate: String,
    combinator: Option<Combinator>,
    where_args: Vec<Value>,
    group_by: Vec<String>,
    having: String,
    having_args: Vec<Value>,
    order: Option<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    error: Option<String>,
}

impl SqlBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn table(&mut self, table: &str) -> &mut Self {
        self.table.clear();
        self.table.push_str(table);
        self
    }

    pub fn alias(&mut self, alias: &str) -> &mut Self {
        self.alias = Some(alias.to_string());
        self
    }

    /// Appends columns (or any expression) to the selection.
    pub fn select<S: AsRef<str>>(&mut self, columns: impl IntoIterator<Item = S>) -> &mut Self {
        self.columns
            .extend(columns.into_iter().map(|v| v.as_ref().to_string()));
        self
    }

    /// Adds a condition combined with AND.
    pub fn filter(
        &mut self,
        condition: &str,
        args: impl IntoIterator<Item = Value>,
    ) -> &mut Self {
        self.push_condition(Combinator::And, condition);
        self.where_args.extend(args);
        self
    }

    /// Adds a condition combined with OR.
    pub fn or_filter(
        &mut self,
        condition: &str,
        args: impl IntoIterator<Item = Value>,
    ) -> &mut Self {
        self.push_condition(Combinator::Or, condition);
        self.where_args.extend(args);
        self
    }

    /// `column IN (?, ...)` combined with AND, an empty collection matches nothing.
    pub fn filter_in(&mut self, column: &str, values: impl IntoIterator<Item = Value>) -> &mut Self {
        let start = self.where_args.len();
        self.where_args.extend(values);
        let count = self.where_args.len() - start;
        if count == 0 {
            self.push_condition(Combinator::And, "1 = 0");
            return self;
        }
        let mut condition = String::with_capacity(column.len() + 6 + count * 3);
        condition.push_str(column);
        condition.push_str(" IN (");
        separated_by(&mut condition, 0..count, |out, _| out.push('?'), ", ");
        condition.push(')');
        self.push_condition(Combinator::And, &condition);
        self
    }

    fn push_condition(&mut self, combinator: Combinator, condition: &str) {
        if self.predicate.is_empty() {
            self.predicate.push('(');
            self.predicate.push_str(condition);
            self.predicate.push(')');
            return;
        }
        if self.combinator.is_some_and(|v| v != combinator) {
            self.predicate.insert(0, '(');
            self.predicate.push(')');
        }
        self.combinator = Some(combinator);
        self.predicate.push_str(combinator.keyword());
        self.predicate.push('(');
        self.predicate.push_str(condition);
        self.predicate.push(')');
    }

    /// Full join clause, for example `LEFT JOIN orders o ON o.user_id = users.id`.
    pub fn join(&mut self, clause: &str) -> &mut Self {
        if let Some(token) = FORBIDDEN_IN_JOIN.iter().find(|v| clause.contains(*v)) {
            if self.error.is_none() {
                self.error = Some(format!(
                    "Join clause `{clause}` contains the forbidden token `{token}`"
                ));
            }
            return self;
        }
        self.joins.push(clause.trim().to_string());
        self
    }

    pub fn group_by<S: AsRef<str>>(&mut self, columns: impl IntoIterator<Item = S>) -> &mut Self {
        self.group_by
            .extend(columns.into_iter().map(|v| v.as_ref().to_string()));
        self
    }

    /// Adds a HAVING condition combined with AND.
    pub fn having(&mut self, condition: &str, args: impl IntoIterator<Item = Value>) -> &mut Self {
        if !self.having.is_empty() {
            self.having.push_str(" AND ");
        }
        self.having.push('(');
        self.having.push_str(condition);
        self.having.push(')');
        self.having_args.extend(args);
        self
    }

    pub fn order_by(&mut self, order: &str) -> &mut Self {
        self.order = Some(order.to_string());
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    /// The name columns are qualified with: the alias when set, the quoted table otherwise.
    pub fn qualifier(&self, dialect: &dyn Dialect) -> String {
        match &self.alias {
            Some(alias) => alias.clone(),
            None => {
                let mut out = String::new();
                self.write_table(&mut out, dialect);
                out
            }
        }
    }

    pub fn has_predicate(&self) -> bool {
        !self.predicate.is_empty()
    }

    /// Empties every clause, keeping the allocated buffers.
    pub fn reset(&mut self) {
        self.table.clear();
        self.alias = None;
        self.columns.clear();
        self.joins.clear();
        self.predicate.clear();
        self.combinator = None;
        self.where_args.clear();
        self.group_by.clear();
        self.having.clear();
        self.having_args.clear();
        self.order = None;
        self.limit = None;
        self.offset = None;
        self.error = None;
    }

    fn check(&self) -> Result<()> {
        if let Some(error) = &self.error {
            return Err(ErrorKind::invalid_sql(error.clone()));
        }
        if self.table.is_empty() {
            return Err(ErrorKind::invalid_sql("The statement has no table"));
        }
        Ok(())
    }

    fn write_table(&self, out: &mut String, dialect: &dyn Dialect) {
        if is_plain_identifier(&self.table) {
            dialect.write_identifier(out, &self.table);
        } else {
            out.push_str(&self.table);
        }
    }

    fn write_from(&self, out: &mut String, dialect: &dyn Dialect) {
        out.push_str(" FROM ");
        self.write_table(out, dialect);
        if let Some(alias) = &self.alias {
            out.push(' ');
            out.push_str(alias);
        }
        for join in &self.joins {
            out.push(' ');
            out.push_str(join);
        }
        if !self.predicate.is_empty() {
            out.push_str(" WHERE ");
            out.push_str(&self.predicate);
        }
        if !self.group_by.is_empty() {
            out.push_str(" GROUP BY ");
            separated_by(out, &self.group_by, |out, v| out.push_str(v), ", ");
        }
        if !self.having.is_empty() {
            out.push_str(" HAVING ");
            out.push_str(&self.having);
        }
    }

    fn write_selection(&self, out: &mut String, dialect: &dyn Dialect) {
        if self.columns.is_empty() {
            match &self.alias {
                Some(alias) => out.push_str(alias),
                None => self.write_table(out, dialect),
            }
            out.push_str(".*");
        } else {
            separated_by(out, &self.columns, |out, v| out.push_str(v), ", ");
        }
    }

    fn arguments(&self) -> Vec<Value> {
        let mut args = Vec::with_capacity(self.where_args.len() + self.having_args.len());
        args.extend(self.where_args.iter().cloned());
        args.extend(self.having_args.iter().cloned());
        args
    }

    pub fn render_select(&self, dialect: &dyn Dialect) -> Result<Statement> {
        self.check()?;
        let mut sql = String::with_capacity(128);
        sql.push_str("SELECT ");
        self.write_selection(&mut sql, dialect);
        self.write_from(&mut sql, dialect);
        if let Some(order) = &self.order {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }
        dialect.write_limit_offset(&mut sql, self.limit, self.offset, self.order.is_some());
        bind_placeholders(dialect, &sql, self.arguments())
    }

    /// `SELECT COUNT(*)` over the rows the select would return, ignoring order, limit and offset.
    pub fn render_count(&self, dialect: &dyn Dialect) -> Result<Statement> {
        self.check()?;
        let mut sql = String::with_capacity(128);
        if self.group_by.is_empty() {
            sql.push_str("SELECT COUNT(*)");
            self.write_from(&mut sql, dialect);
        } else {
            sql.push_str("SELECT COUNT(*) FROM (SELECT ");
            self.write_selection(&mut sql, dialect);
            self.write_from(&mut sql, dialect);
            sql.push_str(") grouped");
        }
        bind_placeholders(dialect, &sql, self.arguments())
    }

    /// UPDATE of the filtered rows, assignments are written in column order.
    pub fn render_update(
        &self,
        dialect: &dyn Dialect,
        assignments: &BTreeMap<String, Value>,
    ) -> Result<Statement> {
        self.check()?;
        if assignments.is_empty() {
            return Err(ErrorKind::invalid_sql(format!(
                "UPDATE of `{}` without any assignment",
                self.table
            )));
        }
        let mut sql = String::with_capacity(128);
        sql.push_str("UPDATE ");
        self.write_table(&mut sql, dialect);
        sql.push_str(" SET ");
        separated_by(
            &mut sql,
            assignments.keys(),
            |out, column| {
                dialect.write_identifier(out, column);
                out.push_str(" = ?");
            },
            ", ",
        );
        if !self.predicate.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.predicate);
        }
        let mut args = Vec::with_capacity(assignments.len() + self.where_args.len());
        args.extend(assignments.values().cloned());
        args.extend(self.where_args.iter().cloned());
        bind_placeholders(dialect, &sql, args)
    }

    /// DELETE of the filtered rows, refused when nothing restricts it.
    pub fn render_delete(&self, dialect: &dyn Dialect) -> Result<Statement> {
        self.check()?;
        if self.predicate.is_empty() {
            return Err(ErrorKind::invalid_sql(format!(
                "Refusing to DELETE from `{}` without a predicate",
                self.table
            )));
        }
        let mut sql = String::with_capacity(128);
        sql.push_str("DELETE FROM ");
        self.write_table(&mut sql, dialect);
        sql.push_str(" WHERE ");
        sql.push_str(&self.predicate);
        bind_placeholders(dialect, &sql, self.where_args.clone())
    }
}

/// Rewrites every `?` outside quoted text into the dialect placeholder, numbering them from 1 in
/// order of appearance.
pub fn bind_placeholders(dialect: &dyn Dialect, sql: &str, args: Vec<Value>) -> Result<Statement> {
    let mut out = String::with_capacity(sql.len() + args.len() * 2);
    let mut quote: Option<char> = None;
    let mut count = 0;
    for c in sql.chars() {
        match (quote, c) {
            (None, '\'' | '"' | '`') => {
                quote = Some(c);
                out.push(c);
            }
            (None, '?') => {
                count += 1;
                dialect.write_placeholder(&mut out, count);
            }
            (Some(q), c) if q == c => {
                // A doubled quote reopens right away, which is the same as staying inside
                quote = None;
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    if count != args.len() {
        return Err(ErrorKind::invalid_sql(format!(
            "The statement has {count} placeholders but {} arguments: {}",
            args.len(),
            crate::truncate_long!(sql)
        )));
    }
    Ok(Statement::new(out, args))
}

/// Bounded stash of idle builders, reused to keep their buffers.
#[derive(Debug)]
pub struct BuilderPool {
    idle: Mutex<Vec<SqlBuilder>>,
    capacity: usize,
}

impl BuilderPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn acquire(&self) -> PooledBuilder<'_> {
        let builder = unpoison(self.idle.lock()).pop().unwrap_or_default();
        PooledBuilder {
            pool: self,
            builder,
        }
    }

    pub fn idle(&self) -> usize {
        unpoison(self.idle.lock()).len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A builder borrowed from a [`BuilderPool`], reset and handed back when dropped.
#[derive(Debug)]
pub struct PooledBuilder<'p> {
    pool: &'p BuilderPool,
    builder: SqlBuilder,
}

impl Deref for PooledBuilder<'_> {
    type Target = SqlBuilder;
    fn deref(&self) -> &Self::Target {
        &self.builder
    }
}

impl DerefMut for PooledBuilder<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.builder
    }
}

impl Drop for PooledBuilder<'_> {
    fn drop(&mut self) {
        let mut builder = mem::take(&mut self.builder);
        builder.reset();
        let mut idle = unpoison(self.pool.idle.lock());
        if idle.len() < self.pool.capacity {
            idle.push(builder);
        }
    }
}
