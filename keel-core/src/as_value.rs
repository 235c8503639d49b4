use crate::{
    Error, Result, Value, format_date, format_time, format_timestamp, format_timestamptz,
    scan_date, scan_time, scan_timestamp, scan_timestamptz,
};
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use std::{
    any,
    str::{self, FromStr},
};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Conversion between Rust field types and [`Value`].
///
/// `try_from_value` accepts the canonical variant of the type and, where the conversion is
/// lossless or range checked, any compatible scalar kind: integers of other widths, booleans from
/// integers, numbers from text, text from blobs. Everything else is an error naming both sides.
///
/// ```rust
/// use keel_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert_eq!(v, Value::Int32(Some(42)));
/// assert_eq!(i64::try_from_value(v).unwrap(), 42);
/// ```
pub trait AsValue {
    /// The typed NULL of this type.
    fn as_empty_value() -> Value;
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(Some(value.into()))
    }
}

fn mismatch<T>(value: &Value) -> Error {
    Error::msg(format!(
        "Cannot convert {} value {} to {}",
        value.kind_name(),
        value,
        any::type_name::<T>(),
    ))
}

macro_rules! impl_as_value_integer {
    ($source:ty, $destination:path) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                if let $destination(Some(v)) = value {
                    return Ok(v);
                }
                let wide = match &value {
                    Value::Boolean(Some(v)) => Some(*v as i128),
                    Value::Float32(Some(v)) if v.fract() == 0.0 => Some(*v as i128),
                    Value::Float64(Some(v)) if v.fract() == 0.0 => Some(*v as i128),
                    Value::Decimal(Some(v)) if v.fract().is_zero() => v.to_i128(),
                    Value::Varchar(Some(v)) => Some(v.trim().parse::<i128>().map_err(|e| {
                        Error::new(e).context(format!(
                            "Cannot parse `{v}` as {}",
                            any::type_name::<Self>()
                        ))
                    })?),
                    _ => value.as_integer(),
                };
                let Some(wide) = wide else {
                    return Err(mismatch::<Self>(&value));
                };
                <$source>::try_from(wide).map_err(|_| {
                    Error::msg(format!(
                        "Value {wide} is out of range for {}",
                        any::type_name::<Self>(),
                    ))
                })
            }
        }
    };
}

impl_as_value_integer!(i8, Value::Int8);
impl_as_value_integer!(i16, Value::Int16);
impl_as_value_integer!(i32, Value::Int32);
impl_as_value_integer!(i64, Value::Int64);
impl_as_value_integer!(u8, Value::UInt8);
impl_as_value_integer!(u16, Value::UInt16);
impl_as_value_integer!(u32, Value::UInt32);
impl_as_value_integer!(u64, Value::UInt64);

impl AsValue for bool {
    fn as_empty_value() -> Value {
        Value::Boolean(None)
    }
    fn as_value(self) -> Value {
        Value::Boolean(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if let Value::Boolean(Some(v)) = value {
            return Ok(v);
        }
        if let Some(v) = value.as_integer() {
            return Ok(v != 0);
        }
        if let Value::Varchar(Some(v)) = &value {
            match v.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" | "yes" => return Ok(true),
                "false" | "f" | "0" | "no" => return Ok(false),
                _ => {}
            }
        }
        Err(mismatch::<Self>(&value))
    }
}

macro_rules! impl_as_value_float {
    ($source:ty, $destination:path, $other:path, $to:ident) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match &value {
                    $destination(Some(v)) => return Ok(*v),
                    $other(Some(v)) => return Ok(*v as _),
                    Value::Decimal(Some(v)) => {
                        if let Some(v) = v.$to() {
                            return Ok(v);
                        }
                    }
                    Value::Varchar(Some(v)) => {
                        return v.trim().parse::<$source>().map_err(|e| {
                            Error::new(e).context(format!(
                                "Cannot parse `{v}` as {}",
                                any::type_name::<Self>()
                            ))
                        });
                    }
                    _ => {
                        if let Some(v) = value.as_integer() {
                            return Ok(v as _);
                        }
                    }
                }
                Err(mismatch::<Self>(&value))
            }
        }
    };
}

impl_as_value_float!(f32, Value::Float32, Value::Float64, to_f32);
impl_as_value_float!(f64, Value::Float64, Value::Float32, to_f64);

impl AsValue for Decimal {
    fn as_empty_value() -> Value {
        Value::Decimal(None)
    }
    fn as_value(self) -> Value {
        Value::Decimal(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        let result = match &value {
            Value::Decimal(Some(v)) => Some(*v),
            Value::Float32(Some(v)) => Decimal::from_f32(*v),
            Value::Float64(Some(v)) => Decimal::from_f64(*v),
            Value::Varchar(Some(v)) => Some(Decimal::from_str(v.trim()).map_err(|e| {
                Error::new(e).context(format!("Cannot parse `{v}` as a decimal"))
            })?),
            _ => value.as_integer().and_then(Decimal::from_i128),
        };
        result.ok_or_else(|| mismatch::<Self>(&value))
    }
}

impl AsValue for String {
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(self) -> Value {
        Value::Varchar(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Ok(match value {
            Value::Varchar(Some(v)) => v,
            Value::Blob(Some(v)) => String::from_utf8(v.into_vec())
                .map_err(|e| Error::new(e).context("Blob is not valid UTF-8"))?,
            Value::Date(Some(v)) => format_date(&v),
            Value::Time(Some(v)) => format_time(&v),
            Value::Timestamp(Some(v)) => format_timestamp(&v),
            Value::TimestampWithTimezone(Some(v)) => format_timestamptz(&v),
            value if value.is_null() => return Err(mismatch::<Self>(&value)),
            value => value.to_string(),
        })
    }
}

impl AsValue for Vec<u8> {
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(self) -> Value {
        Value::Blob(Some(self.into_boxed_slice()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(Some(v)) => Ok(v.into_vec()),
            Value::Varchar(Some(v)) => Ok(v.into_bytes()),
            Value::Uuid(Some(v)) => Ok(v.as_bytes().to_vec()),
            value => Err(mismatch::<Self>(&value)),
        }
    }
}

impl AsValue for Box<[u8]> {
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(self) -> Value {
        Value::Blob(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Vec::<u8>::try_from_value(value).map(Vec::into_boxed_slice)
    }
}

impl AsValue for Uuid {
    fn as_empty_value() -> Value {
        Value::Uuid(None)
    }
    fn as_value(self) -> Value {
        Value::Uuid(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Uuid(Some(v)) => Ok(*v),
            Value::Varchar(Some(v)) => Uuid::parse_str(v.trim())
                .map_err(|e| Error::new(e).context(format!("Cannot parse `{v}` as a uuid"))),
            Value::Blob(Some(v)) if v.len() == 16 => {
                Uuid::from_slice(v).map_err(|e| Error::new(e).context("Invalid uuid bytes"))
            }
            Value::Blob(Some(v)) => str::from_utf8(v)
                .ok()
                .and_then(|v| Uuid::parse_str(v.trim()).ok())
                .ok_or_else(|| mismatch::<Self>(&value)),
            _ => Err(mismatch::<Self>(&value)),
        }
    }
}

macro_rules! impl_as_value_temporal {
    ($source:ty, $destination:path, $scan:ident) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                if value.is_null() {
                    return Err(mismatch::<Self>(&value));
                }
                $scan(&value)
            }
        }
    };
}

impl_as_value_temporal!(Date, Value::Date, scan_date);
impl_as_value_temporal!(Time, Value::Time, scan_time);
impl_as_value_temporal!(PrimitiveDateTime, Value::Timestamp, scan_timestamp);
impl_as_value_temporal!(
    OffsetDateTime,
    Value::TimestampWithTimezone,
    scan_timestamptz
);

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        T::try_from_value(value).map(Some)
    }
}
