use crate::{Error, Result, Value, XmlDocument, truncate_long};
use anyhow::Context;
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use std::any;
use time::{Duration, PrimitiveDateTime, macros::format_description};
use uuid::Uuid;

/// Conversion between native Rust types and the dynamically typed [`Value`].
///
/// `try_from_value` carries the coercion matrix applied when a row column does not have
/// the native type of the field it lands in:
/// - integers accept any other integer (range checked), floats and decimals (truncated),
///   booleans and numeric text;
/// - `bool` accepts integers and decimals, `1` is `true` and everything else `false`;
/// - `Decimal` accepts any integer or float;
/// - `Uuid` accepts its text form (simple or hyphenated) or exactly 16 bytes;
/// - `time::Duration` accepts an integer count of 100ns ticks;
/// - `XmlDocument` accepts text;
/// - `String` accepts anything, through the [`Value`] stringifier.
///
/// NULL is only accepted by `Option<T>`.
///
/// ```rust
/// use strata_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert!(matches!(v, Value::Int32(Some(42))));
/// let b: bool = AsValue::try_from_value(Value::Int64(Some(1))).unwrap();
/// assert!(b);
/// ```
pub trait AsValue {
    /// The NULL of this type.
    fn as_empty_value() -> Value;
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
    /// Parse the textual representation (as stored in a text column).
    fn parse(input: impl AsRef<str>) -> Result<Self>
    where
        Self: Sized,
    {
        Err(Error::msg(format!(
            "Cannot parse `{}` as {}",
            truncate_long!(input.as_ref()),
            any::type_name::<Self>()
        )))
    }
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

fn conversion_error<T>(value: &Value) -> Error {
    Error::msg(format!(
        "Cannot convert {:?} to {}",
        value,
        any::type_name::<T>()
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
                let wide = match value {
                    $destination(Some(v)) => return Ok(v),
                    Value::Float32(Some(v)) => v.trunc() as i128,
                    Value::Float64(Some(v)) => v.trunc() as i128,
                    Value::Decimal(Some(v)) => v
                        .trunc()
                        .to_i128()
                        .ok_or_else(|| conversion_error::<Self>(&value))?,
                    Value::Varchar(Some(ref v)) => return <Self as AsValue>::parse(v),
                    ref v => v.as_i128().ok_or_else(|| conversion_error::<Self>(v))?,
                };
                <$source>::try_from(wide).map_err(|_| {
                    Error::msg(format!(
                        "Value {} is out of range for {}",
                        wide,
                        any::type_name::<Self>(),
                    ))
                })
            }
            fn parse(input: impl AsRef<str>) -> Result<Self> {
                let input = input.as_ref();
                input.trim().parse::<$source>().with_context(|| {
                    format!(
                        "Cannot parse `{}` as {}",
                        truncate_long!(input),
                        any::type_name::<Self>()
                    )
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

macro_rules! impl_as_value_float {
    ($source:ty, $destination:path, $other:path) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    $destination(Some(v)) => Ok(v),
                    $other(Some(v)) => Ok(v as _),
                    Value::Decimal(Some(v)) => v
                        .to_f64()
                        .map(|v| v as _)
                        .ok_or_else(|| conversion_error::<Self>(&value)),
                    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
                    ref v => v
                        .as_i128()
                        .map(|v| v as _)
                        .ok_or_else(|| conversion_error::<Self>(v)),
                }
            }
            fn parse(input: impl AsRef<str>) -> Result<Self> {
                let input = input.as_ref();
                input.trim().parse::<$source>().with_context(|| {
                    format!(
                        "Cannot parse `{}` as {}",
                        truncate_long!(input),
                        any::type_name::<Self>()
                    )
                })
            }
        }
    };
}
impl_as_value_float!(f32, Value::Float32, Value::Float64);
impl_as_value_float!(f64, Value::Float64, Value::Float32);

impl AsValue for bool {
    fn as_empty_value() -> Value {
        Value::Boolean(None)
    }
    fn as_value(self) -> Value {
        Value::Boolean(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(Some(v)) => Ok(v),
            Value::Decimal(Some(v)) => Ok(v == Decimal::ONE),
            Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
            ref v => v
                .as_i128()
                .map(|v| v == 1)
                .ok_or_else(|| conversion_error::<Self>(v)),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        let input = input.as_ref().trim();
        if input.eq_ignore_ascii_case("true") || input == "1" {
            Ok(true)
        } else if input.eq_ignore_ascii_case("false") || input == "0" {
            Ok(false)
        } else {
            Err(Error::msg(format!(
                "Cannot parse `{}` as bool",
                truncate_long!(input)
            )))
        }
    }
}

impl AsValue for Decimal {
    fn as_empty_value() -> Value {
        Value::Decimal(None)
    }
    fn as_value(self) -> Value {
        Value::Decimal(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Decimal(Some(v)) => Ok(v),
            Value::Float32(Some(v)) => {
                Decimal::from_f32(v).ok_or_else(|| conversion_error::<Self>(&value))
            }
            Value::Float64(Some(v)) => {
                Decimal::from_f64(v).ok_or_else(|| conversion_error::<Self>(&value))
            }
            Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
            ref v => v
                .as_i128()
                .and_then(Decimal::from_i128)
                .ok_or_else(|| conversion_error::<Self>(v)),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        let input = input.as_ref();
        input.trim().parse::<Decimal>().with_context(|| {
            format!("Cannot parse `{}` as Decimal", truncate_long!(input))
        })
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
        match value {
            Value::Varchar(Some(v)) => Ok(v),
            Value::Xml(Some(v)) => Ok(v.into_string()),
            v if !v.is_null() => Ok(v.to_string()),
            v => Err(conversion_error::<Self>(&v)),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        Ok(input.as_ref().to_string())
    }
}

impl AsValue for char {
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(self) -> Value {
        Value::Varchar(Some(self.to_string()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
            ref v => Err(conversion_error::<Self>(v)),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        let mut chars = input.as_ref().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(Error::msg(format!(
                "Cannot parse `{}` as char, expected exactly one character",
                truncate_long!(input.as_ref())
            ))),
        }
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
        match value {
            Value::Uuid(Some(v)) => Ok(v),
            Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
            Value::Blob(Some(ref v)) => Uuid::from_slice(v)
                .with_context(|| format!("Cannot convert {} bytes to Uuid", v.len())),
            ref v => Err(conversion_error::<Self>(v)),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        let input = input.as_ref();
        Uuid::parse_str(input.trim())
            .with_context(|| format!("Cannot parse `{}` as Uuid", truncate_long!(input)))
    }
}

impl AsValue for PrimitiveDateTime {
    fn as_empty_value() -> Value {
        Value::DateTime(None)
    }
    fn as_value(self) -> Value {
        Value::DateTime(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::DateTime(Some(v)) => Ok(v),
            Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
            ref v => Err(conversion_error::<Self>(v)),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        let input = input.as_ref().trim();
        let formats = [
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        ];
        for format in formats {
            if let Ok(v) = PrimitiveDateTime::parse(input, format) {
                return Ok(v);
            }
        }
        if let Ok(v) = time::Date::parse(input, format_description!("[year]-[month]-[day]")) {
            return Ok(v.midnight());
        }
        Err(Error::msg(format!(
            "Cannot parse `{}` as PrimitiveDateTime",
            truncate_long!(input)
        )))
    }
}

/// Length of a tick, the unit intervals are stored with.
pub const TICK_NANOSECONDS: i128 = 100;

impl AsValue for Duration {
    fn as_empty_value() -> Value {
        Value::Interval(None)
    }
    fn as_value(self) -> Value {
        Value::Interval(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        let ticks = match value {
            Value::Interval(Some(v)) => return Ok(v),
            Value::Decimal(Some(v)) => v.trunc().to_i128(),
            Value::Varchar(Some(ref v)) => i64::parse(v).ok().map(|v| v as i128),
            ref v => v.as_i128(),
        }
        .ok_or_else(|| conversion_error::<Self>(&value))?;
        let nanoseconds = ticks * TICK_NANOSECONDS;
        i64::try_from(nanoseconds)
            .map(Duration::nanoseconds)
            .map_err(|_| Error::msg(format!("Interval of {} ticks is out of range", ticks)))
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
            ref v => Err(conversion_error::<Self>(v)),
        }
    }
}

impl AsValue for XmlDocument {
    fn as_empty_value() -> Value {
        Value::Xml(None)
    }
    fn as_value(self) -> Value {
        Value::Xml(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Xml(Some(v)) => Ok(v),
            Value::Varchar(Some(v)) => XmlDocument::parse(v),
            ref v => Err(conversion_error::<Self>(v)),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        XmlDocument::parse(input.as_ref())
    }
}

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
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        T::parse(input).map(Some)
    }
}
