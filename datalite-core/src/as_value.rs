use crate::{
    Error, Result, StorageClass, Value,
    temporal::{format_date, format_time, format_timestamp, parse_date, parse_time, parse_timestamp},
    truncate_long,
};
use std::any;
use time::{Date, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Conversion between native Rust types and the dynamically typed [`Value`].
///
/// Every field type of a record implements this trait. The empty value doubles as the
/// semantic type of the column, `NULLABLE` tells whether the column accepts nulls.
///
/// # Conversion rules
/// - `try_from_value` accepts the canonical variant of the type.
/// - Integers, floats and booleans also accept the other numeric variants, with range
///   checks, plus their textual form. The store hands back the widest variant it has.
/// - Temporal types and uuids are stored as text and parsed back from `Value::Varchar`.
///
/// ```rust
/// use datalite_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert!(matches!(v, Value::Int32(Some(42))));
/// let n: i16 = AsValue::try_from_value(Value::Int64(Some(42))).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    /// Whether the absence of a value is representable.
    const NULLABLE: bool = false;
    /// The null value of this type, also used as the type prototype of a column.
    fn as_empty_value() -> Value;
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
}

fn cannot_convert<T>(value: &Value) -> Error {
    Error::msg(format!(
        "Cannot convert {:?} to {}",
        value,
        any::type_name::<T>()
    ))
}

fn integer_of(value: &Value) -> Option<i128> {
    Some(match *value {
        Value::Boolean(Some(v)) => v as _,
        Value::Int8(Some(v)) => v as _,
        Value::Int16(Some(v)) => v as _,
        Value::Int32(Some(v)) => v as _,
        Value::Int64(Some(v)) => v as _,
        Value::UInt8(Some(v)) => v as _,
        Value::UInt16(Some(v)) => v as _,
        Value::UInt32(Some(v)) => v as _,
        Value::UInt64(Some(v)) => v as _,
        Value::Float32(Some(v)) if v.fract() == 0.0 => v as _,
        Value::Float64(Some(v)) if v.fract() == 0.0 => v as _,
        _ => return None,
    })
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
                let wide = match (integer_of(&value), &value) {
                    (Some(v), ..) => v,
                    (None, Value::Varchar(Some(v))) => v.trim().parse::<i128>().map_err(|e| {
                        Error::msg(format!(
                            "Cannot parse `{}` as {}: {}",
                            truncate_long!(v),
                            any::type_name::<Self>(),
                            e
                        ))
                    })?,
                    _ => return Err(cannot_convert::<Self>(&value)),
                };
                <$source>::try_from(wide).map_err(|_| {
                    Error::msg(format!(
                        "Value {wide} is out of range for {}",
                        any::type_name::<Self>()
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

macro_rules! impl_as_value_float {
    ($source:ty, $destination:path) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    Value::Float32(Some(v)) => Ok(v as _),
                    Value::Float64(Some(v)) => Ok(v as _),
                    Value::Varchar(Some(ref v)) => v.trim().parse::<$source>().map_err(|e| {
                        Error::msg(format!(
                            "Cannot parse `{}` as {}: {}",
                            truncate_long!(v),
                            any::type_name::<Self>(),
                            e
                        ))
                    }),
                    ref v if v.storage_class() == Some(StorageClass::Integer) => integer_of(v)
                        .map(|v| v as _)
                        .ok_or_else(|| cannot_convert::<Self>(v)),
                    _ => Err(cannot_convert::<Self>(&value)),
                }
            }
        }
    };
}
impl_as_value_float!(f32, Value::Float32);
impl_as_value_float!(f64, Value::Float64);

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
            Value::Varchar(Some(ref v)) => match v.trim() {
                x if x.eq_ignore_ascii_case("true") || x == "1" => Ok(true),
                x if x.eq_ignore_ascii_case("false") || x == "0" => Ok(false),
                _ => Err(cannot_convert::<Self>(&value)),
            },
            ref v => integer_of(v)
                .map(|v| v != 0)
                .ok_or_else(|| cannot_convert::<Self>(v)),
        }
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
            Value::Boolean(Some(v)) => v.to_string(),
            Value::Float32(Some(v)) => v.to_string(),
            Value::Float64(Some(v)) => v.to_string(),
            Value::Blob(Some(v)) => String::from_utf8(v.into_vec())
                .map_err(|e| Error::msg(format!("Blob is not valid utf-8 text: {e}")))?,
            Value::Date(Some(v)) => format_date(&v)?,
            Value::Time(Some(v)) => format_time(&v)?,
            Value::Timestamp(Some(v)) => format_timestamp(&v)?,
            Value::Uuid(Some(v)) => v.to_string(),
            ref v => integer_of(v)
                .map(|v| v.to_string())
                .ok_or_else(|| cannot_convert::<Self>(v))?,
        })
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
        match value {
            Value::Blob(Some(v)) => Ok(v),
            Value::Varchar(Some(v)) => Ok(v.into_bytes().into_boxed_slice()),
            _ => Err(cannot_convert::<Self>(&value)),
        }
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
        <Box<[u8]> as AsValue>::try_from_value(value).map(Into::into)
    }
}

macro_rules! impl_as_value_text {
    ($source:ty, $destination:path, $parse:expr) => {
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
                    Value::Varchar(Some(ref v)) => $parse(v.as_str()),
                    _ => Err(cannot_convert::<Self>(&value)),
                }
            }
        }
    };
}
impl_as_value_text!(Date, Value::Date, |v: &str| parse_date(v));
impl_as_value_text!(Time, Value::Time, |v: &str| parse_time(v));
impl_as_value_text!(PrimitiveDateTime, Value::Timestamp, |v: &str| {
    parse_timestamp(v)
});
impl_as_value_text!(Uuid, Value::Uuid, |v: &str| {
    Uuid::parse_str(v.trim()).map_err(|e| {
        Error::msg(format!(
            "Cannot parse `{}` as a uuid: {}",
            truncate_long!(v),
            e
        ))
    })
});

impl<T: AsValue> AsValue for Option<T> {
    const NULLABLE: bool = true;
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
        Ok(if value.is_null() {
            None
        } else {
            Some(<T as AsValue>::try_from_value(value)?)
        })
    }
}

/// Untyped passthrough, it has no storage class and cannot back a column.
impl AsValue for Value {
    const NULLABLE: bool = true;
    fn as_empty_value() -> Value {
        Value::Null
    }
    fn as_value(self) -> Value {
        self
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}
