//! Temporal scanning.
//!
//! Drivers hand temporal columns back in many shapes: native values, text in several layouts,
//! raw bytes of that text, unix epoch integers. MySQL additionally stores "no date" as the
//! all-zero sentinel `0000-00-00 00:00:00`, which no calendar type can hold: it is normalized to
//! [`ZERO_TIMESTAMP`].

use crate::{Error, Result, Value, truncate_long};
use std::str;
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::{datetime, format_description},
};

/// The zero value of a timestamp field.
pub const ZERO_TIMESTAMP: PrimitiveDateTime = datetime!(0001-01-01 0:00);

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIME_FORMATS: [&[BorrowedFormatItem<'static>]; 3] = [
    format_description!("[hour]:[minute]:[second].[subsecond]"),
    format_description!("[hour]:[minute]:[second]"),
    format_description!("[hour]:[minute]"),
];
const TIMESTAMP_FORMATS: [&[BorrowedFormatItem<'static>]; 5] = [
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]"),
];
const TIMESTAMPTZ_FORMATS: [&[BorrowedFormatItem<'static>]; 4] = [
    format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]"
    ),
    format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
    ),
    format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]"
    ),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]"),
];
const TIMESTAMP_OUTPUT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]");
const TIME_OUTPUT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second].[subsecond digits:6]");

fn is_zero_sentinel(text: &str) -> bool {
    text.starts_with("0000-00-00")
        && text
            .chars()
            .all(|c| matches!(c, '0' | '-' | ':' | ' ' | 'T' | '.' | '+' | 'Z'))
}

/// Extracts the textual form of a temporal value, if it has one.
fn textual(value: &Value) -> Result<Option<&str>> {
    Ok(match value {
        Value::Varchar(Some(v)) => Some(v.trim()),
        Value::Blob(Some(v)) => Some(
            str::from_utf8(v)
                .map_err(|e| Error::new(e).context("Temporal bytes are not valid UTF-8"))?
                .trim(),
        ),
        _ => None,
    })
}

fn cannot_convert(value: &Value, target: &str) -> Error {
    let text = value.to_string();
    Error::msg(format!(
        "Cannot convert {} value `{}` to {target}",
        value.kind_name(),
        truncate_long!(text)
    ))
}

pub fn scan_timestamp(value: &Value) -> Result<PrimitiveDateTime> {
    match value {
        Value::Timestamp(Some(v)) => return Ok(*v),
        Value::TimestampWithTimezone(Some(v)) => {
            let v = v.to_offset(UtcOffset::UTC);
            return Ok(PrimitiveDateTime::new(v.date(), v.time()));
        }
        Value::Date(Some(v)) => return Ok(PrimitiveDateTime::new(*v, Time::MIDNIGHT)),
        _ => {}
    }
    if let Some(v) = value.as_integer() {
        let v = i64::try_from(v)
            .ok()
            .and_then(|v| OffsetDateTime::from_unix_timestamp(v).ok())
            .ok_or_else(|| cannot_convert(value, "a timestamp"))?;
        return Ok(PrimitiveDateTime::new(v.date(), v.time()));
    }
    let Some(text) = textual(value)? else {
        return Err(cannot_convert(value, "a timestamp"));
    };
    if is_zero_sentinel(text) {
        return Ok(ZERO_TIMESTAMP);
    }
    if let Some(v) = TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| PrimitiveDateTime::parse(text, format).ok())
    {
        return Ok(v);
    }
    if let Ok(v) = Date::parse(text, DATE_FORMAT) {
        return Ok(PrimitiveDateTime::new(v, Time::MIDNIGHT));
    }
    scan_timestamptz(value)
        .map(|v| {
            let v = v.to_offset(UtcOffset::UTC);
            PrimitiveDateTime::new(v.date(), v.time())
        })
        .map_err(|_| cannot_convert(value, "a timestamp"))
}

pub fn scan_timestamptz(value: &Value) -> Result<OffsetDateTime> {
    match value {
        Value::TimestampWithTimezone(Some(v)) => return Ok(*v),
        Value::Timestamp(Some(v)) => return Ok(v.assume_utc()),
        _ => {}
    }
    if let Some(v) = value.as_integer() {
        return i64::try_from(v)
            .ok()
            .and_then(|v| OffsetDateTime::from_unix_timestamp(v).ok())
            .ok_or_else(|| cannot_convert(value, "a timestamp with time zone"));
    }
    let Some(text) = textual(value)? else {
        return Err(cannot_convert(value, "a timestamp with time zone"));
    };
    if is_zero_sentinel(text) {
        return Ok(ZERO_TIMESTAMP.assume_utc());
    }
    if let Ok(v) = OffsetDateTime::parse(text, &Rfc3339) {
        return Ok(v);
    }
    if let Some(v) = TIMESTAMPTZ_FORMATS
        .iter()
        .find_map(|format| OffsetDateTime::parse(text, format).ok())
    {
        return Ok(v);
    }
    // No offset in the text, interpreted as UTC
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| PrimitiveDateTime::parse(text, format).ok())
        .map(PrimitiveDateTime::assume_utc)
        .ok_or_else(|| cannot_convert(value, "a timestamp with time zone"))
}

pub fn scan_date(value: &Value) -> Result<Date> {
    match value {
        Value::Date(Some(v)) => return Ok(*v),
        Value::Timestamp(Some(v)) => return Ok(v.date()),
        Value::TimestampWithTimezone(Some(v)) => return Ok(v.date()),
        _ => {}
    }
    let Some(text) = textual(value)? else {
        return Err(cannot_convert(value, "a date"));
    };
    if is_zero_sentinel(text) {
        return Ok(ZERO_TIMESTAMP.date());
    }
    Date::parse(text, DATE_FORMAT)
        .ok()
        .or_else(|| scan_timestamp(value).ok().map(|v| v.date()))
        .ok_or_else(|| cannot_convert(value, "a date"))
}

pub fn scan_time(value: &Value) -> Result<Time> {
    match value {
        Value::Time(Some(v)) => return Ok(*v),
        Value::Timestamp(Some(v)) => return Ok(v.time()),
        Value::TimestampWithTimezone(Some(v)) => return Ok(v.time()),
        _ => {}
    }
    let Some(text) = textual(value)? else {
        return Err(cannot_convert(value, "a time"));
    };
    TIME_FORMATS
        .iter()
        .find_map(|format| Time::parse(text, format).ok())
        .ok_or_else(|| cannot_convert(value, "a time"))
}

pub fn format_date(value: &Date) -> String {
    value
        .format(DATE_FORMAT)
        .unwrap_or_else(|_| value.to_string())
}

pub fn format_time(value: &Time) -> String {
    value
        .format(TIME_OUTPUT)
        .unwrap_or_else(|_| value.to_string())
}

pub fn format_timestamp(value: &PrimitiveDateTime) -> String {
    value
        .format(TIMESTAMP_OUTPUT)
        .unwrap_or_else(|_| value.to_string())
}

pub fn format_timestamptz(value: &OffsetDateTime) -> String {
    value
        .format(&Rfc3339)
        .unwrap_or_else(|_| value.to_string())
}
