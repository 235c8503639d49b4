use crate::{Dialect, Field, FieldType, ModelMeta, dialect::write_value_rows, separated_by};
use std::fmt::Write;

#[derive(Debug, Default, Clone, Copy)]
pub struct SqlServerDialect;

impl Dialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn write_identifier(&self, out: &mut String, value: &str) {
        out.push('[');
        for c in value.chars() {
            if c == ']' {
                out.push_str("]]");
            } else {
                out.push(c);
            }
        }
        out.push(']');
    }

    fn write_placeholder(&self, out: &mut String, index: usize) {
        let _ = write!(out, "@p{index}");
    }

    fn write_column_type(&self, out: &mut String, field: &Field) {
        match field.ty {
            FieldType::Boolean => out.push_str("BIT"),
            FieldType::Int8 | FieldType::Int16 => out.push_str("SMALLINT"),
            FieldType::UInt8 => out.push_str("TINYINT"),
            FieldType::Int32 | FieldType::UInt16 => out.push_str("INT"),
            FieldType::Int64 | FieldType::UInt32 => out.push_str("BIGINT"),
            FieldType::UInt64 => out.push_str("DECIMAL(20, 0)"),
            FieldType::Float32 => out.push_str("REAL"),
            FieldType::Float64 => out.push_str("FLOAT"),
            FieldType::Decimal => out.push_str("DECIMAL(38, 10)"),
            FieldType::Varchar => match field.size {
                Some(size) if size <= 4000 => {
                    let _ = write!(out, "NVARCHAR({size})");
                }
                None if field.primary_key || field.unique || field.references.is_some() => {
                    out.push_str("NVARCHAR(450)")
                }
                _ => out.push_str("NVARCHAR(MAX)"),
            },
            FieldType::Blob => out.push_str("VARBINARY(MAX)"),
            FieldType::Date => out.push_str("DATE"),
            FieldType::Time => out.push_str("TIME"),
            FieldType::Timestamp => out.push_str("DATETIME2"),
            FieldType::TimestampWithTimezone => out.push_str("DATETIMEOFFSET"),
            FieldType::Uuid => out.push_str("UNIQUEIDENTIFIER"),
        }
    }

    fn write_auto_increment(&self, out: &mut String, _field: &Field) {
        out.push_str(" IDENTITY(1,1)");
    }

    fn write_create_table(&self, out: &mut String, model: &ModelMeta, if_not_exists: bool) {
        if if_not_exists {
            out.push_str("IF OBJECT_ID(N'");
            out.push_str(&model.table.replace('\'', "''"));
            out.push_str("', N'U') IS NULL ");
        }
        out.push_str("CREATE TABLE ");
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
        out.push_str(" ADD ");
        self.write_column_definition(out, field);
    }

    fn write_table_exists(&self, out: &mut String) {
        out.push_str("SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_NAME = ?");
    }

    fn write_columns_query(&self, out: &mut String) {
        out.push_str(
            "SELECT COLUMN_NAME FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = ? ORDER BY ORDINAL_POSITION",
        );
    }

    fn write_limit_offset(
        &self,
        out: &mut String,
        limit: Option<u64>,
        offset: Option<u64>,
        ordered: bool,
    ) {
        if limit.is_none() && offset.is_none() {
            return;
        }
        if !ordered {
            // OFFSET FETCH is only allowed after an ORDER BY
            out.push_str(" ORDER BY (SELECT NULL)");
        }
        let _ = write!(out, " OFFSET {} ROWS", offset.unwrap_or(0));
        if let Some(limit) = limit {
            let _ = write!(out, " FETCH NEXT {limit} ROWS ONLY");
        }
    }

    fn supports_returning(&self) -> bool {
        true
    }

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
        if !columns.is_empty() {
            out.push_str(" (");
            separated_by(out, columns, |out, v| self.write_identifier(out, v), ", ");
            out.push(')');
        }
        if let Some(returning) = returning {
            out.push_str(" OUTPUT INSERTED.");
            self.write_identifier(out, returning);
        }
        if columns.is_empty() {
            out.push_str(" DEFAULT VALUES");
        } else {
            out.push_str(" VALUES ");
            write_value_rows(out, columns.len(), rows);
        }
    }
}
