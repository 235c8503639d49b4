//! Backend specific SQL syntax.
//!
//! [`Dialect`] provides the generic (mostly ANSI) rendering as default methods, each backend
//! overrides only what differs.

mod mysql;
mod oracle;
mod postgres;
mod sqlite;
mod sqlserver;

pub use mysql::MySqlDialect;
pub use oracle::OracleDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;
pub use sqlserver::SqlServerDialect;

use crate::{ErrorKind, Field, FieldType, ModelMeta, Result, separated_by};
use std::{collections::HashMap, fmt::Write, sync::Arc};

pub trait Dialect: Send + Sync {
    /// Registry key of the dialect.
    fn name(&self) -> &'static str;

    fn write_identifier(&self, out: &mut String, value: &str) {
        out.push('"');
        for c in value.chars() {
            if c == '"' {
                out.push_str("\"\"");
            } else {
                out.push(c);
            }
        }
        out.push('"');
    }

    fn quoted(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        self.write_identifier(&mut out, value);
        out
    }

    /// Renders the placeholder for the 1-based argument `index`.
    fn write_placeholder(&self, out: &mut String, index: usize) {
        let _ = index;
        out.push('?');
    }

    /// Writes the SQL type of the field, panics when the backend cannot store it.
    fn write_column_type(&self, out: &mut String, field: &Field) {
        match field.ty {
            FieldType::Boolean => out.push_str("BOOLEAN"),
            FieldType::Int8 | FieldType::Int16 | FieldType::UInt8 => out.push_str("SMALLINT"),
            FieldType::Int32 | FieldType::UInt16 => out.push_str("INTEGER"),
            FieldType::Int64 | FieldType::UInt32 => out.push_str("BIGINT"),
            FieldType::UInt64 => out.push_str("NUMERIC(20)"),
            FieldType::Float32 => out.push_str("REAL"),
            FieldType::Float64 => out.push_str("DOUBLE PRECISION"),
            FieldType::Decimal => out.push_str("NUMERIC"),
            FieldType::Varchar => match field.size {
                Some(size) => {
                    let _ = write!(out, "VARCHAR({size})");
                }
                None => out.push_str("VARCHAR(255)"),
            },
            FieldType::Blob => out.push_str("BLOB"),
            FieldType::Date => out.push_str("DATE"),
            FieldType::Time => out.push_str("TIME"),
            FieldType::Timestamp => out.push_str("TIMESTAMP"),
            FieldType::TimestampWithTimezone => out.push_str("TIMESTAMP WITH TIME ZONE"),
            FieldType::Uuid => out.push_str("CHAR(36)"),
        }
    }

    /// Keyword making an integer primary key generated by the database.
    fn write_auto_increment(&self, out: &mut String, field: &Field) {
        let _ = (out, field);
    }

    fn write_column_definition(&self, out: &mut String, field: &Field) {
        self.write_identifier(out, &field.column);
        out.push(' ');
        self.write_column_type(out, field);
        if field.auto_increment {
            self.write_auto_increment(out, field);
        }
        if !field.nullable && !field.primary_key {
            out.push_str(" NOT NULL");
        }
        if let Some(default) = &field.default {
            out.push_str(" DEFAULT ");
            out.push_str(default);
        }
        if field.primary_key {
            out.push_str(" PRIMARY KEY");
        }
        if field.unique && !field.primary_key {
            out.push_str(" UNIQUE");
        }
        if let Some(references) = &field.references {
            if let Some(table) = &references.table {
                out.push_str(" REFERENCES ");
                self.write_identifier(out, table);
                out.push('(');
                self.write_identifier(out, &references.column);
                out.push(')');
            }
        }
    }

    fn write_create_table(&self, out: &mut String, model: &ModelMeta, if_not_exists: bool) {
        out.push_str("CREATE TABLE ");
        if if_not_exists {
            out.push_str("IF NOT EXISTS ");
        }
        self.write_identifier(out, &model.table);
        out.push_str(" (");
        separated_by(
            out,
            model.fields.iter(),
            |out, field| self.write_column_definition(out, field),
            ", ",
        );
        out.push(')');
    }

    fn write_add_column(&self, out: &mut String, table: &str, field: &Field) {
        out.push_str("ALTER TABLE ");
        self.write_identifier(out, table);
        out.push_str(" ADD COLUMN ");
        self.write_column_definition(out, field);
    }

    fn write_drop_table(&self, out: &mut String, table: &str, if_exists: bool) {
        out.push_str("DROP TABLE ");
        if if_exists {
            out.push_str("IF EXISTS ");
        }
        self.write_identifier(out, table);
    }

    /// Query returning one row with a count greater than zero when the table exists. Takes the
    /// table name as its only argument.
    fn write_table_exists(&self, out: &mut String) {
        out.push_str(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = CURRENT_SCHEMA AND table_name = ?",
        );
    }

    /// Query returning the column names of a table in the first column of each row. Takes the
    /// table name as its only argument.
    fn write_columns_query(&self, out: &mut String) {
        out.push_str(
            "SELECT column_name FROM information_schema.columns WHERE table_schema = CURRENT_SCHEMA AND table_name = ? ORDER BY ordinal_position",
        );
    }

    /// `ordered` tells whether an ORDER BY clause was already written.
    fn write_limit_offset(
        &self,
        out: &mut String,
        limit: Option<u64>,
        offset: Option<u64>,
        ordered: bool,
    ) {
        let _ = ordered;
        if let Some(limit) = limit {
            let _ = write!(out, " LIMIT {limit}");
        }
        if let Some(offset) = offset {
            let _ = write!(out, " OFFSET {offset}");
        }
    }

    /// Whether inserts can hand back generated keys with `write_insert`'s `returning`.
    fn supports_returning(&self) -> bool {
        false
    }

    /// Writes an INSERT of `rows` rows using generic placeholders.
    fn write_insert(
        &self,
        out: &mut String,
        table: &str,
        columns: &[&str],
        rows: usize,
        returning: Option<&str>,
    ) {
        out.push_str("INSERT INTO ");
        self.write_identifier(out, table);
        if columns.is_empty() {
            out.push_str(" DEFAULT VALUES");
        } else {
            out.push_str(" (");
            separated_by(out, columns, |out, v| self.write_identifier(out, v), ", ");
            out.push_str(") VALUES ");
            write_value_rows(out, columns.len(), rows);
        }
        if let Some(returning) = returning {
            out.push_str(" RETURNING ");
            self.write_identifier(out, returning);
        }
    }
}

/// `(?, ?), (?, ?)` for `rows` rows of `columns` values.
pub fn write_value_rows(out: &mut String, columns: usize, rows: usize) {
    separated_by(
        out,
        0..rows,
        |out, _| {
            out.push('(');
            separated_by(out, 0..columns, |out, _| out.push('?'), ", ");
            out.push(')');
        },
        ", ",
    );
}

/// Dialects selectable by string key.
#[derive(Clone)]
pub struct DialectRegistry {
    dialects: HashMap<String, Arc<dyn Dialect>>,
}

impl DialectRegistry {
    pub fn empty() -> Self {
        Self {
            dialects: HashMap::new(),
        }
    }

    /// All the built-in dialects under their keys and usual aliases.
    pub fn with_defaults() -> Self {
        let mut result = Self::empty();
        result.register("mysql", Arc::new(MySqlDialect));
        result.register("mariadb", Arc::new(MySqlDialect));
        result.register("postgres", Arc::new(PostgresDialect));
        result.register("postgresql", Arc::new(PostgresDialect));
        result.register("sqlite", Arc::new(SqliteDialect));
        result.register("sqlserver", Arc::new(SqlServerDialect));
        result.register("mssql", Arc::new(SqlServerDialect));
        result.register("oracle", Arc::new(OracleDialect));
        result
    }

    pub fn register(&mut self, key: impl Into<String>, dialect: Arc<dyn Dialect>) {
        self.dialects.insert(key.into().to_ascii_lowercase(), dialect);
    }

    pub fn get(&self, key: &str) -> Result<Arc<dyn Dialect>> {
        self.dialects
            .get(&key.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| ErrorKind::UnknownDialect(key.to_string()).into())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.dialects.keys().map(String::as_str)
    }
}

impl Default for DialectRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
