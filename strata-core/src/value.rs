use crate::XmlDocument;
use rust_decimal::Decimal;
use std::fmt::{self, Display};
use time::{Duration, PrimitiveDateTime};
use uuid::Uuid;

/// Native storage type of a column, as reported by the driver for a result shape or
/// declared by a mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Decimal,
    Text,
    DateTime,
    Uuid,
    Interval,
    Bytes,
    Xml,
}

impl ColumnType {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::Int8
                | ColumnType::Int16
                | ColumnType::Int32
                | ColumnType::Int64
                | ColumnType::UInt8
                | ColumnType::UInt16
                | ColumnType::UInt32
                | ColumnType::UInt64
        )
    }
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Dynamically typed value moving between mapped fields, statement parameters and rows.
///
/// Every variant carries an `Option` so that a typed NULL keeps its column type.
#[derive(Default, Debug, Clone, PartialEq)]
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
    DateTime(Option<PrimitiveDateTime>),
    Uuid(Option<Uuid>),
    Interval(Option<Duration>),
    Blob(Option<Box<[u8]>>),
    Xml(Option<XmlDocument>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            Value::Null
                | Value::Boolean(None)
                | Value::Int8(None)
                | Value::Int16(None)
                | Value::Int32(None)
                | Value::Int64(None)
                | Value::UInt8(None)
                | Value::UInt16(None)
                | Value::UInt32(None)
                | Value::UInt64(None)
                | Value::Float32(None)
                | Value::Float64(None)
                | Value::Decimal(None)
                | Value::Varchar(None)
                | Value::DateTime(None)
                | Value::Uuid(None)
                | Value::Interval(None)
                | Value::Blob(None)
                | Value::Xml(None)
        )
    }

    /// The native type tag, `None` for an untyped NULL.
    pub fn column_type(&self) -> Option<ColumnType> {
        Some(match self {
            Value::Null => return None,
            Value::Boolean(..) => ColumnType::Boolean,
            Value::Int8(..) => ColumnType::Int8,
            Value::Int16(..) => ColumnType::Int16,
            Value::Int32(..) => ColumnType::Int32,
            Value::Int64(..) => ColumnType::Int64,
            Value::UInt8(..) => ColumnType::UInt8,
            Value::UInt16(..) => ColumnType::UInt16,
            Value::UInt32(..) => ColumnType::UInt32,
            Value::UInt64(..) => ColumnType::UInt64,
            Value::Float32(..) => ColumnType::Float32,
            Value::Float64(..) => ColumnType::Float64,
            Value::Decimal(..) => ColumnType::Decimal,
            Value::Varchar(..) => ColumnType::Text,
            Value::DateTime(..) => ColumnType::DateTime,
            Value::Uuid(..) => ColumnType::Uuid,
            Value::Interval(..) => ColumnType::Interval,
            Value::Blob(..) => ColumnType::Bytes,
            Value::Xml(..) => ColumnType::Xml,
        })
    }

    /// Empty value of the given type.
    pub fn empty(column_type: ColumnType) -> Value {
        match column_type {
            ColumnType::Boolean => Value::Boolean(None),
            ColumnType::Int8 => Value::Int8(None),
            ColumnType::Int16 => Value::Int16(None),
            ColumnType::Int32 => Value::Int32(None),
            ColumnType::Int64 => Value::Int64(None),
            ColumnType::UInt8 => Value::UInt8(None),
            ColumnType::UInt16 => Value::UInt16(None),
            ColumnType::UInt32 => Value::UInt32(None),
            ColumnType::UInt64 => Value::UInt64(None),
            ColumnType::Float32 => Value::Float32(None),
            ColumnType::Float64 => Value::Float64(None),
            ColumnType::Decimal => Value::Decimal(None),
            ColumnType::Text => Value::Varchar(None),
            ColumnType::DateTime => Value::DateTime(None),
            ColumnType::Uuid => Value::Uuid(None),
            ColumnType::Interval => Value::Interval(None),
            ColumnType::Bytes => Value::Blob(None),
            ColumnType::Xml => Value::Xml(None),
        }
    }

    /// Integer payload widened to `i128`, for any integer or boolean variant.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Value::Boolean(Some(v)) => Some(v as i128),
            Value::Int8(Some(v)) => Some(v as i128),
            Value::Int16(Some(v)) => Some(v as i128),
            Value::Int32(Some(v)) => Some(v as i128),
            Value::Int64(Some(v)) => Some(v as i128),
            Value::UInt8(Some(v)) => Some(v as i128),
            Value::UInt16(Some(v)) => Some(v as i128),
            Value::UInt32(Some(v)) => Some(v as i128),
            Value::UInt64(Some(v)) => Some(v as i128),
            _ => None,
        }
    }
}

/// Generic stringifier used when a text field receives a non text column.
impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(Some(v)) => write!(f, "{}", v),
            Value::Int8(Some(v)) => write!(f, "{}", v),
            Value::Int16(Some(v)) => write!(f, "{}", v),
            Value::Int32(Some(v)) => write!(f, "{}", v),
            Value::Int64(Some(v)) => write!(f, "{}", v),
            Value::UInt8(Some(v)) => write!(f, "{}", v),
            Value::UInt16(Some(v)) => write!(f, "{}", v),
            Value::UInt32(Some(v)) => write!(f, "{}", v),
            Value::UInt64(Some(v)) => write!(f, "{}", v),
            Value::Float32(Some(v)) => write!(f, "{}", v),
            Value::Float64(Some(v)) => write!(f, "{}", v),
            Value::Decimal(Some(v)) => write!(f, "{}", v),
            Value::Varchar(Some(v)) => f.write_str(v),
            Value::DateTime(Some(v)) => write!(f, "{}", v),
            Value::Uuid(Some(v)) => write!(f, "{}", v),
            Value::Interval(Some(v)) => write!(f, "{}", v),
            Value::Blob(Some(v)) => f.write_str(&hex::encode_upper(v)),
            Value::Xml(Some(v)) => f.write_str(v.as_str()),
            _ => Ok(()),
        }
    }
}
