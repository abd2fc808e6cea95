use crate::{AsValue, Result};
use time::{Date, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Dynamically typed value moved between records and the store.
///
/// A variant holding `None` doubles as a type prototype: `Value::Int64(None)` describes an
/// integer column, while `Value::Null` is an untyped null with no storage class.
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
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
    Date(Option<Date>),
    Time(Option<Time>),
    Timestamp(Option<PrimitiveDateTime>),
    Uuid(Option<Uuid>),
}

/// Storage classes a column can have in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    Integer,
    Real,
    Text,
    Blob,
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
            (Self::Varchar(l), Self::Varchar(r)) => l == r,
            (Self::Blob(l), Self::Blob(r)) => l == r,
            (Self::Date(l), Self::Date(r)) => l == r,
            (Self::Time(l), Self::Time(r)) => l == r,
            (Self::Timestamp(l), Self::Timestamp(r)) => l == r,
            (Self::Uuid(l), Self::Uuid(r)) => l == r,
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
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
            Value::Varchar(v) => v.is_none(),
            Value::Blob(v) => v.is_none(),
            Value::Date(v) => v.is_none(),
            Value::Time(v) => v.is_none(),
            Value::Timestamp(v) => v.is_none(),
            Value::Uuid(v) => v.is_none(),
        }
    }

    pub fn same_type(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }

    /// The null value of the same semantic type.
    pub fn as_null(&self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Boolean(..) => Value::Boolean(None),
            Value::Int8(..) => Value::Int8(None),
            Value::Int16(..) => Value::Int16(None),
            Value::Int32(..) => Value::Int32(None),
            Value::Int64(..) => Value::Int64(None),
            Value::UInt8(..) => Value::UInt8(None),
            Value::UInt16(..) => Value::UInt16(None),
            Value::UInt32(..) => Value::UInt32(None),
            Value::UInt64(..) => Value::UInt64(None),
            Value::Float32(..) => Value::Float32(None),
            Value::Float64(..) => Value::Float64(None),
            Value::Varchar(..) => Value::Varchar(None),
            Value::Blob(..) => Value::Blob(None),
            Value::Date(..) => Value::Date(None),
            Value::Time(..) => Value::Time(None),
            Value::Timestamp(..) => Value::Timestamp(None),
            Value::Uuid(..) => Value::Uuid(None),
        }
    }

    /// How the store keeps values of this type, `None` for the untyped null.
    pub fn storage_class(&self) -> Option<StorageClass> {
        Some(match self {
            Value::Null => return None,
            Value::Boolean(..)
            | Value::Int8(..)
            | Value::Int16(..)
            | Value::Int32(..)
            | Value::Int64(..)
            | Value::UInt8(..)
            | Value::UInt16(..)
            | Value::UInt32(..)
            | Value::UInt64(..) => StorageClass::Integer,
            Value::Float32(..) | Value::Float64(..) => StorageClass::Real,
            Value::Varchar(..)
            | Value::Date(..)
            | Value::Time(..)
            | Value::Timestamp(..)
            | Value::Uuid(..) => StorageClass::Text,
            Value::Blob(..) => StorageClass::Blob,
        })
    }

    /// Convert this value into the semantic type of `prototype`.
    ///
    /// Nulls stay null (typed after the prototype), the untyped prototype accepts anything.
    pub fn convert_to(self, prototype: &Value) -> Result<Value> {
        if self.is_null() {
            return Ok(prototype.as_null());
        }
        if self.same_type(prototype) {
            return Ok(self);
        }
        Ok(match prototype {
            Value::Null => self,
            Value::Boolean(..) => bool::try_from_value(self)?.as_value(),
            Value::Int8(..) => i8::try_from_value(self)?.as_value(),
            Value::Int16(..) => i16::try_from_value(self)?.as_value(),
            Value::Int32(..) => i32::try_from_value(self)?.as_value(),
            Value::Int64(..) => i64::try_from_value(self)?.as_value(),
            Value::UInt8(..) => u8::try_from_value(self)?.as_value(),
            Value::UInt16(..) => u16::try_from_value(self)?.as_value(),
            Value::UInt32(..) => u32::try_from_value(self)?.as_value(),
            Value::UInt64(..) => u64::try_from_value(self)?.as_value(),
            Value::Float32(..) => f32::try_from_value(self)?.as_value(),
            Value::Float64(..) => f64::try_from_value(self)?.as_value(),
            Value::Varchar(..) => String::try_from_value(self)?.as_value(),
            Value::Blob(..) => Box::<[u8]>::try_from_value(self)?.as_value(),
            Value::Date(..) => Date::try_from_value(self)?.as_value(),
            Value::Time(..) => Time::try_from_value(self)?.as_value(),
            Value::Timestamp(..) => PrimitiveDateTime::try_from_value(self)?.as_value(),
            Value::Uuid(..) => Uuid::try_from_value(self)?.as_value(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, time};

    #[test]
    fn nulls_keep_their_type() {
        assert!(Value::Int32(None).is_null());
        assert!(!Value::Int32(Some(0)).is_null());
        assert_eq!(Value::Varchar(Some("a".into())).as_null(), Value::Varchar(None));
        assert!(Value::Null.storage_class().is_none());
        assert_eq!(
            Value::Int64(Some(1))
                .as_null()
                .convert_to(&Value::Float64(None))
                .unwrap(),
            Value::Float64(None)
        );
    }

    #[test]
    fn storage_classes() {
        assert_eq!(Value::Boolean(None).storage_class(), Some(StorageClass::Integer));
        assert_eq!(Value::UInt64(None).storage_class(), Some(StorageClass::Integer));
        assert_eq!(Value::Float32(None).storage_class(), Some(StorageClass::Real));
        assert_eq!(Value::Timestamp(None).storage_class(), Some(StorageClass::Text));
        assert_eq!(Value::Uuid(None).storage_class(), Some(StorageClass::Text));
        assert_eq!(Value::Blob(None).storage_class(), Some(StorageClass::Blob));
    }

    #[test]
    fn convert_between_types() {
        assert_eq!(
            Value::Int64(Some(12)).convert_to(&Value::Int16(None)).unwrap(),
            Value::Int16(Some(12))
        );
        assert_eq!(
            Value::Int64(Some(12)).convert_to(&Value::Varchar(None)).unwrap(),
            Value::Varchar(Some("12".into()))
        );
        assert_eq!(
            Value::Varchar(Some("34".into()))
                .convert_to(&Value::UInt32(None))
                .unwrap(),
            Value::UInt32(Some(34))
        );
        assert_eq!(
            Value::Int64(Some(1)).convert_to(&Value::Boolean(None)).unwrap(),
            Value::Boolean(Some(true))
        );
        assert_eq!(
            Value::Varchar(Some("2024-02-29".into()))
                .convert_to(&Value::Date(None))
                .unwrap(),
            Value::Date(Some(date!(2024 - 02 - 29)))
        );
        assert_eq!(
            Value::Varchar(Some("23:59:01.25".into()))
                .convert_to(&Value::Time(None))
                .unwrap(),
            Value::Time(Some(time!(23:59:01.25)))
        );
        assert_eq!(
            Value::Varchar(Some("1999-12-31 10:00:00.0".into()))
                .convert_to(&Value::Timestamp(None))
                .unwrap(),
            Value::Timestamp(Some(datetime!(1999-12-31 10:00)))
        );
        assert!(
            Value::Int64(Some(300))
                .convert_to(&Value::Int8(None))
                .is_err()
        );
        assert!(
            Value::Varchar(Some("abc".into()))
                .convert_to(&Value::Int64(None))
                .is_err()
        );
    }
}
