use crate::{Dialect, Field, FieldType};
use std::fmt::Write;

#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn write_placeholder(&self, out: &mut String, index: usize) {
        let _ = write!(out, "${index}");
    }

    fn write_column_type(&self, out: &mut String, field: &Field) {
        if field.auto_increment {
            match field.ty {
                FieldType::Int8 | FieldType::Int16 | FieldType::UInt8 => {
                    return out.push_str("SMALLSERIAL");
                }
                FieldType::Int32 | FieldType::UInt16 => return out.push_str("SERIAL"),
                FieldType::Int64 | FieldType::UInt32 => return out.push_str("BIGSERIAL"),
                _ => {}
            }
        }
        match field.ty {
            FieldType::Boolean => out.push_str("BOOLEAN"),
            FieldType::Int8 | FieldType::Int16 | FieldType::UInt8 => out.push_str("SMALLINT"),
            FieldType::Int32 | FieldType::UInt16 => out.push_str("INTEGER"),
            FieldType::Int64 | FieldType::UInt32 => out.push_str("BIGINT"),
            FieldType::UInt64 => panic!(
                "Postgres has no type able to store `{}` (u64), use i64 or Decimal instead",
                field.name
            ),
            FieldType::Float32 => out.push_str("REAL"),
            FieldType::Float64 => out.push_str("DOUBLE PRECISION"),
            FieldType::Decimal => out.push_str("NUMERIC"),
            FieldType::Varchar => match field.size {
                Some(size) => {
                    let _ = write!(out, "VARCHAR({size})");
                }
                None => out.push_str("TEXT"),
            },
            FieldType::Blob => out.push_str("BYTEA"),
            FieldType::Date => out.push_str("DATE"),
            FieldType::Time => out.push_str("TIME"),
            FieldType::Timestamp => out.push_str("TIMESTAMP"),
            FieldType::TimestampWithTimezone => out.push_str("TIMESTAMPTZ"),
            FieldType::Uuid => out.push_str("UUID"),
        }
    }

    fn supports_returning(&self) -> bool {
        true
    }
}
