use crate::{Dialect, Field, FieldType, separated_by};
use std::fmt::Write;

#[derive(Debug, Default, Clone, Copy)]
pub struct OracleDialect;

impl OracleDialect {
    fn write_into(&self, out: &mut String, table: &str, columns: &[&str]) {
        out.push_str("INTO ");
        self.write_identifier(out, table);
        out.push_str(" (");
        separated_by(out, columns, |out, v| self.write_identifier(out, v), ", ");
        out.push_str(") VALUES (");
        separated_by(out, columns, |out, _| out.push('?'), ", ");
        out.push(')');
    }
}

impl Dialect for OracleDialect {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn write_placeholder(&self, out: &mut String, index: usize) {
        let _ = write!(out, ":{index}");
    }

    fn write_column_type(&self, out: &mut String, field: &Field) {
        match field.ty {
            FieldType::Boolean => out.push_str("NUMBER(1)"),
            FieldType::Int8 | FieldType::UInt8 => out.push_str("NUMBER(3)"),
            FieldType::Int16 | FieldType::UInt16 => out.push_str("NUMBER(5)"),
            FieldType::Int32 | FieldType::UInt32 => out.push_str("NUMBER(10)"),
            FieldType::Int64 => out.push_str("NUMBER(19)"),
            FieldType::UInt64 => out.push_str("NUMBER(20)"),
            FieldType::Float32 => out.push_str("BINARY_FLOAT"),
            FieldType::Float64 => out.push_str("BINARY_DOUBLE"),
            FieldType::Decimal => out.push_str("NUMBER"),
            FieldType::Varchar => {
                let _ = write!(out, "VARCHAR2({})", field.size.unwrap_or(4000));
            }
            FieldType::Blob => out.push_str("BLOB"),
            FieldType::Date => out.push_str("DATE"),
            FieldType::Time => panic!(
                "Oracle has no time of day type able to store `{}`, use a timestamp instead",
                field.name
            ),
            FieldType::Timestamp => out.push_str("TIMESTAMP"),
            FieldType::TimestampWithTimezone => out.push_str("TIMESTAMP WITH TIME ZONE"),
            FieldType::Uuid => out.push_str("VARCHAR2(36)"),
        }
    }

    fn write_auto_increment(&self, out: &mut String, _field: &Field) {
        out.push_str(" GENERATED BY DEFAULT AS IDENTITY");
    }

    fn write_add_column(&self, out: &mut String, table: &str, field: &Field) {
        out.push_str("ALTER TABLE ");
        self.write_identifier(out, table);
        out.push_str(" ADD (");
        self.write_column_definition(out, field);
        out.push(')');
    }

    fn write_table_exists(&self, out: &mut String) {
        out.push_str("SELECT COUNT(*) FROM user_tables WHERE table_name = ?");
    }

    fn write_columns_query(&self, out: &mut String) {
        out.push_str(
            "SELECT column_name FROM user_tab_columns WHERE table_name = ? ORDER BY column_id",
        );
    }

    fn write_limit_offset(
        &self,
        out: &mut String,
        limit: Option<u64>,
        offset: Option<u64>,
        _ordered: bool,
    ) {
        if let Some(offset) = offset {
            let _ = write!(out, " OFFSET {offset} ROWS");
        }
        if let Some(limit) = limit {
            let _ = write!(out, " FETCH NEXT {limit} ROWS ONLY");
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
        if rows <= 1 || columns.is_empty() {
            out.push_str("INSERT ");
            if columns.is_empty() {
                out.push_str("INTO ");
                self.write_identifier(out, table);
                out.push_str(" VALUES (DEFAULT)");
            } else {
                self.write_into(out, table, columns);
            }
            return;
        }
        out.push_str("INSERT ALL ");
        separated_by(
            out,
            0..rows,
            |out, _| self.write_into(out, table, columns),
            " ",
        );
        out.push_str(" SELECT 1 FROM DUAL");
    }
}
