use keel_core::{
    AsValue, Result, RowLabeled, RowNames, Statement, Value, format_date, format_time,
    format_timestamp, format_timestamptz,
};
use sqlx::{
    Column, Row, Sqlite, TypeInfo, ValueRef,
    query::Query,
    sqlite::{SqliteArguments, SqliteRow},
};

pub(crate) type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Prepares the statement text with every argument bound in order.
pub(crate) fn build_query(statement: &Statement) -> SqliteQuery<'_> {
    let mut query = sqlx::query(&statement.sql);
    for value in &statement.args {
        query = bind_value(query, value);
    }
    query
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    if value.is_null() {
        return query.bind(Option::<i64>::None);
    }
    match value {
        Value::Boolean(Some(v)) => query.bind(*v),
        Value::Float32(Some(v)) => query.bind(*v as f64),
        Value::Float64(Some(v)) => query.bind(*v),
        Value::Decimal(Some(v)) => query.bind(v.to_string()),
        Value::Varchar(Some(v)) => query.bind(v.clone()),
        Value::Blob(Some(v)) => query.bind(v.to_vec()),
        Value::Date(Some(v)) => query.bind(format_date(v)),
        Value::Time(Some(v)) => query.bind(format_time(v)),
        Value::Timestamp(Some(v)) => query.bind(format_timestamp(v)),
        Value::TimestampWithTimezone(Some(v)) => query.bind(format_timestamptz(v)),
        Value::Uuid(Some(v)) => query.bind(v.hyphenated().to_string()),
        _ => match value.as_integer().map(i64::try_from) {
            Some(Ok(v)) => query.bind(v),
            // Beyond the INTEGER range of sqlite
            _ => query.bind(value.to_string()),
        },
    }
}

pub(crate) fn extract_value(row: &SqliteRow, index: usize) -> Result<Value> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage = raw.type_info().name().to_string();
    Ok(match storage.as_str() {
        "INTEGER" | "INT" | "BIGINT" | "BOOLEAN" => {
            row.try_get_unchecked::<i64, _>(index)?.as_value()
        }
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
            row.try_get_unchecked::<f64, _>(index)?.as_value()
        }
        "BLOB" => row.try_get_unchecked::<Vec<u8>, _>(index)?.as_value(),
        _ => row.try_get_unchecked::<String, _>(index)?.as_value(),
    })
}

pub(crate) fn extract_rows(rows: Vec<SqliteRow>) -> Result<Vec<RowLabeled>> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let labels: RowNames = first
        .columns()
        .iter()
        .map(|v| v.name().to_string())
        .collect();
    rows.iter()
        .map(|row| {
            Ok(RowLabeled::new(
                labels.clone(),
                (0..labels.len())
                    .map(|i| extract_value(row, i))
                    .collect::<Result<_>>()?,
            ))
        })
        .collect()
}
