use crate::{Value, truncate_long};
use std::{
    fmt::{self, Display},
    sync::Arc,
};

/// Final statement text with its positional arguments, in placeholder order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

impl From<&str> for Statement {
    fn from(value: &str) -> Self {
        Statement::new(value, Vec::new())
    }
}

impl From<String> for Statement {
    fn from(value: String) -> Self {
        Statement::new(value, Vec::new())
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", truncate_long!(self.sql))
    }
}

/// Outcome of a statement that returns no rows.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowsAffected {
    pub rows_affected: u64,
    /// Rowid or generated key of the last inserted row, for backends reporting one.
    pub last_affected_id: Option<i64>,
}

/// Column labels of a result set, shared by all of its rows.
pub type RowNames = Arc<[String]>;
pub type Row = Box<[Value]>;

/// One result row, `values[i]` belongs to the column `labels[i]`.
#[derive(Debug, Clone)]
pub struct RowLabeled {
    pub labels: RowNames,
    pub values: Row,
}

impl RowLabeled {
    pub fn new(labels: RowNames, values: Row) -> Self {
        Self { labels, values }
    }

    /// Value of the column labeled exactly `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.labels
            .iter()
            .position(|v| v == name)
            .and_then(|i| self.values.get(i))
    }
}
