use crate::{Dialect, Field, FieldType, dialect::write_value_rows, separated_by};
use std::fmt::Write;

#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn write_identifier(&self, out: &mut String, value: &str) {
        out.push('`');
        for c in value.chars() {
            if c == '`' {
                out.push_str("``");
            } else {
                out.push(c);
            }
        }
        out.push('`');
    }

    fn write_column_type(&self, out: &mut String, field: &Field) {
        match field.ty {
            FieldType::Boolean => out.push_str("BOOLEAN"),
            FieldType::Int8 => out.push_str("TINYINT"),
            FieldType::Int16 => out.push_str("SMALLINT"),
            FieldType::Int32 => out.push_str("INT"),
            FieldType::Int64 => out.push_str("BIGINT"),
            FieldType::UInt8 => out.push_str("TINYINT UNSIGNED"),
            FieldType::UInt16 => out.push_str("SMALLINT UNSIGNED"),
            FieldType::UInt32 => out.push_str("INT UNSIGNED"),
            FieldType::UInt64 => out.push_str("BIGINT UNSIGNED"),
            FieldType::Float32 => out.push_str("FLOAT"),
            FieldType::Float64 => out.push_str("DOUBLE"),
            FieldType::Decimal => out.push_str("DECIMAL(38, 10)"),
            FieldType::Varchar => match field.size {
                Some(size) => {
                    let _ = write!(out, "VARCHAR({size})");
                }
                // Keys and unique columns cannot be TEXT
                None if field.primary_key || field.unique || field.references.is_some() => {
                    out.push_str("VARCHAR(255)")
                }
                None => out.push_str("TEXT"),
            },
            FieldType::Blob => out.push_str("LONGBLOB"),
            FieldType::Date => out.push_str("DATE"),
            FieldType::Time => out.push_str("TIME(6)"),
            FieldType::Timestamp => out.push_str("DATETIME(6)"),
            FieldType::TimestampWithTimezone => out.push_str("TIMESTAMP(6)"),
            FieldType::Uuid => out.push_str("CHAR(36)"),
        }
    }

    fn write_auto_increment(&self, out: &mut String, _field: &Field) {
        out.push_str(" AUTO_INCREMENT");
    }

    fn write_table_exists(&self, out: &mut String) {
        out.push_str(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = ?",
        );
    }

    fn write_columns_query(&self, out: &mut String) {
        out.push_str(
            "SELECT column_name FROM information_schema.columns WHERE table_schema = DATABASE() AND table_name = ? ORDER BY ordinal_position",
        );
    }

    fn write_limit_offset(
        &self,
        out: &mut String,
        limit: Option<u64>,
        offset: Option<u64>,
        _ordered: bool,
    ) {
        match (limit, offset) {
            (Some(limit), _) => {
                let _ = write!(out, " LIMIT {limit}");
            }
            (None, Some(..)) => {
                let _ = write!(out, " LIMIT {}", u64::MAX);
            }
            (None, None) => {}
        }
        if let Some(offset) = offset {
            let _ = write!(out, " OFFSET {offset}");
        }
    }

    fn write_insert(
        &self,
        out: &mut String,
        table: &str,
        columns: &[&str],
        rows: usize,
        _returning: Option<&str>,
    ) {
        out.push_str("INSERT INTO ");
        self.write_identifier(out, table);
        out.push_str(" (");
        separated_by(out, columns, |out, v| self.write_identifier(out, v), ", ");
        out.push_str(") VALUES ");
        write_value_rows(out, columns.len(), rows);
    }
}
