use crate::{Dialect, Field, FieldType};
use std::fmt::Write;

#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn write_column_type(&self, out: &mut String, field: &Field) {
        match field.ty {
            FieldType::Boolean => out.push_str("BOOLEAN"),
            FieldType::Int8
            | FieldType::Int16
            | FieldType::Int32
            | FieldType::Int64
            | FieldType::UInt8
            | FieldType::UInt16
            | FieldType::UInt32
            | FieldType::UInt64 => out.push_str("INTEGER"),
            FieldType::Float32 | FieldType::Float64 => out.push_str("REAL"),
            FieldType::Decimal => out.push_str("NUMERIC"),
            FieldType::Varchar => match field.size {
                Some(size) => {
                    let _ = write!(out, "VARCHAR({size})");
                }
                None => out.push_str("TEXT"),
            },
            FieldType::Blob => out.push_str("BLOB"),
            FieldType::Date
            | FieldType::Time
            | FieldType::Timestamp
            | FieldType::TimestampWithTimezone
            | FieldType::Uuid => out.push_str("TEXT"),
        }
    }

    fn write_column_definition(&self, out: &mut String, field: &Field) {
        if field.primary_key && field.auto_increment && field.ty.is_integer() {
            // Only this exact spelling aliases the rowid
            self.write_identifier(out, &field.column);
            out.push_str(" INTEGER PRIMARY KEY AUTOINCREMENT");
            return;
        }
        self.write_identifier(out, &field.column);
        out.push(' ');
        self.write_column_type(out, field);
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

    fn write_table_exists(&self, out: &mut String) {
        out.push_str("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?");
    }

    fn write_columns_query(&self, out: &mut String) {
        out.push_str("SELECT name FROM pragma_table_info(?) ORDER BY cid");
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
            // OFFSET is only valid after a LIMIT
            (None, Some(..)) => out.push_str(" LIMIT -1"),
            (None, None) => {}
        }
        if let Some(offset) = offset {
            let _ = write!(out, " OFFSET {offset}");
        }
    }
}
