use crate::ZERO_TIMESTAMP;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use std::fmt::{self, Display, Formatter};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Dynamically typed value exchanged with the execution interface.
///
/// Every variant carries an `Option` so that a typed NULL can be produced (`Value::Int64(None)`).
#[derive(Default, Debug, Clone)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int8(Option<i8>),
    Int16(Option<i16>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    UInt8(Option<u8>),
    UInt16(Option<u16>),
    UInt32(Option<u32>),
    UInt64(Option<u64>),
    Float32(Option<f32>),
    Float64(Option<f64>),
    Decimal(Option<Decimal>),
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
    Date(Option<Date>),
    Time(Option<Time>),
    Timestamp(Option<PrimitiveDateTime>),
    TimestampWithTimezone(Option<OffsetDateTime>),
    Uuid(Option<Uuid>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Int8(l), Self::Int8(r)) => l == r,
            (Self::Int16(l), Self::Int16(r)) => l == r,
            (Self::Int32(l), Self::Int32(r)) => l == r,
            (Self::Int64(l), Self::Int64(r)) => l == r,
            (Self::UInt8(l), Self::UInt8(r)) => l == r,
            (Self::UInt16(l), Self::UInt16(r)) => l == r,
            (Self::UInt32(l), Self::UInt32(r)) => l == r,
            (Self::UInt64(l), Self::UInt64(r)) => l == r,
            (Self::Float32(l), Self::Float32(r)) => l == r,
            (Self::Float64(l), Self::Float64(r)) => l == r,
            (Self::Decimal(l), Self::Decimal(r)) => l == r,
            (Self::Varchar(l), Self::Varchar(r)) => l == r,
            (Self::Blob(l), Self::Blob(r)) => l == r,
            (Self::Date(l), Self::Date(r)) => l == r,
            (Self::Time(l), Self::Time(r)) => l == r,
            (Self::Timestamp(l), Self::Timestamp(r)) => l == r,
            (Self::TimestampWithTimezone(l), Self::TimestampWithTimezone(r)) => l == r,
            (Self::Uuid(l), Self::Uuid(r)) => l == r,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

/// Hashable form of a key column value, used to match parents and children during preloading.
///
/// All integer widths collapse into one variant so that an `INTEGER` foreign key matches a
/// `BIGINT` primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyValue {
    Boolean(bool),
    Integer(i128),
    Text(String),
    Bytes(Box<[u8]>),
    Uuid(Uuid),
}

impl Value {
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Boolean(v) => v.is_none(),
            Value::Int8(v) => v.is_none(),
            Value::Int16(v) => v.is_none(),
            Value::Int32(v) => v.is_none(),
            Value::Int64(v) => v.is_none(),
            Value::UInt8(v) => v.is_none(),
            Value::UInt16(v) => v.is_none(),
            Value::UInt32(v) => v.is_none(),
            Value::UInt64(v) => v.is_none(),
            Value::Float32(v) => v.is_none(),
            Value::Float64(v) => v.is_none(),
            Value::Decimal(v) => v.is_none(),
            Value::Varchar(v) => v.is_none(),
            Value::Blob(v) => v.is_none(),
            Value::Date(v) => v.is_none(),
            Value::Time(v) => v.is_none(),
            Value::Timestamp(v) => v.is_none(),
            Value::TimestampWithTimezone(v) => v.is_none(),
            Value::Uuid(v) => v.is_none(),
        }
    }

    /// Null or the zero value of its kind (0, empty text, nil uuid, zero timestamp).
    pub fn is_zero(&self) -> bool {
        if self.is_null() {
            return true;
        }
        match self {
            Value::Boolean(Some(v)) => !v,
            Value::Float32(Some(v)) => *v == 0.0,
            Value::Float64(Some(v)) => *v == 0.0,
            Value::Decimal(Some(v)) => v.is_zero(),
            Value::Varchar(Some(v)) => v.is_empty(),
            Value::Blob(Some(v)) => v.is_empty(),
            Value::Date(Some(v)) => *v == ZERO_TIMESTAMP.date(),
            Value::Time(Some(v)) => *v == Time::MIDNIGHT,
            Value::Timestamp(Some(v)) => *v == ZERO_TIMESTAMP,
            Value::TimestampWithTimezone(Some(v)) => {
                PrimitiveDateTime::new(v.date(), v.time()) == ZERO_TIMESTAMP
            }
            Value::Uuid(Some(v)) => v.is_nil(),
            _ => self.as_integer() == Some(0),
        }
    }

    pub fn as_integer(&self) -> Option<i128> {
        Some(match self {
            Value::Int8(Some(v)) => *v as i128,
            Value::Int16(Some(v)) => *v as i128,
            Value::Int32(Some(v)) => *v as i128,
            Value::Int64(Some(v)) => *v as i128,
            Value::UInt8(Some(v)) => *v as i128,
            Value::UInt16(Some(v)) => *v as i128,
            Value::UInt32(Some(v)) => *v as i128,
            Value::UInt64(Some(v)) => *v as i128,
            _ => return None,
        })
    }

    /// The hashable key of this value, `None` for nulls and for kinds that make no sense as keys.
    pub fn as_key(&self) -> Option<KeyValue> {
        if let Some(v) = self.as_integer() {
            return Some(KeyValue::Integer(v));
        }
        match self {
            Value::Boolean(Some(v)) => Some(KeyValue::Boolean(*v)),
            Value::Decimal(Some(v)) if v.fract().is_zero() => v.to_i128().map(KeyValue::Integer),
            Value::Decimal(Some(v)) => Some(KeyValue::Text(v.normalize().to_string())),
            Value::Varchar(Some(v)) => Some(KeyValue::Text(v.clone())),
            Value::Blob(Some(v)) => Some(KeyValue::Bytes(v.clone())),
            Value::Uuid(Some(v)) => Some(KeyValue::Uuid(*v)),
            Value::Date(Some(v)) => Some(KeyValue::Text(v.to_string())),
            Value::Timestamp(Some(v)) => Some(KeyValue::Text(v.to_string())),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Boolean(..) => "BOOLEAN",
            Value::Int8(..) => "INT8",
            Value::Int16(..) => "INT16",
            Value::Int32(..) => "INT32",
            Value::Int64(..) => "INT64",
            Value::UInt8(..) => "UINT8",
            Value::UInt16(..) => "UINT16",
            Value::UInt32(..) => "UINT32",
            Value::UInt64(..) => "UINT64",
            Value::Float32(..) => "FLOAT32",
            Value::Float64(..) => "FLOAT64",
            Value::Decimal(..) => "DECIMAL",
            Value::Varchar(..) => "VARCHAR",
            Value::Blob(..) => "BLOB",
            Value::Date(..) => "DATE",
            Value::Time(..) => "TIME",
            Value::Timestamp(..) => "TIMESTAMP",
            Value::TimestampWithTimezone(..) => "TIMESTAMP WITH TIME ZONE",
            Value::Uuid(..) => "UUID",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("NULL");
        }
        match self {
            Value::Boolean(Some(v)) => write!(f, "{v}"),
            Value::Float32(Some(v)) => write!(f, "{v}"),
            Value::Float64(Some(v)) => write!(f, "{v}"),
            Value::Decimal(Some(v)) => write!(f, "{v}"),
            Value::Varchar(Some(v)) => write!(f, "'{}'", v.replace('\'', "''")),
            Value::Blob(Some(v)) => write!(f, "<{} bytes>", v.len()),
            Value::Date(Some(v)) => write!(f, "{v}"),
            Value::Time(Some(v)) => write!(f, "{v}"),
            Value::Timestamp(Some(v)) => write!(f, "{v}"),
            Value::TimestampWithTimezone(Some(v)) => write!(f, "{v}"),
            Value::Uuid(Some(v)) => write!(f, "{v}"),
            _ => match self.as_integer() {
                Some(v) => write!(f, "{v}"),
                None => f.write_str("?"),
            },
        }
    }
}
