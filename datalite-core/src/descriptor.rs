use crate::{Entity, Value};
use std::any;

/// Name of the implicit identity column every table carries.
pub const IDENTITY_COLUMN: &str = "obj_id";

/// Row key assigned by the store.
///
/// `Identity::NONE` until the instance is created, then the identity of its row.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity(pub Option<i64>);

impl Identity {
    pub const NONE: Identity = Identity(None);

    pub const fn new(id: i64) -> Self {
        Self(Some(id))
    }
    pub const fn get(&self) -> Option<i64> {
        self.0
    }
    pub const fn is_persisted(&self) -> bool {
        self.0.is_some()
    }
}

impl From<i64> for Identity {
    fn from(value: i64) -> Self {
        Identity(Some(value))
    }
}

/// One declared field of a record type.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Column name.
    pub name: &'static str,
    /// Semantic type, always a null variant (`Value::Int64(None)`, ..).
    pub value: Value,
    /// The Rust type can hold the absence of a value (`Option<T>`).
    pub nullable: bool,
    pub unique: bool,
    pub not_null: bool,
    /// Value used to fill the column when a migration has no source for it.
    pub default: Option<Value>,
}

impl FieldDef {
    pub fn new(name: &'static str, value: Value) -> Self {
        Self {
            name,
            value,
            nullable: false,
            unique: false,
            not_null: false,
            default: None,
        }
    }
}

/// Ordered field list extracted from a record type.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub type_name: &'static str,
    pub table_name: &'static str,
    pub fields: &'static [FieldDef],
}

impl TypeDescriptor {
    pub fn of<E: Entity>() -> Self {
        Self {
            type_name: any::type_name::<E>(),
            table_name: E::table_name(),
            fields: E::fields(),
        }
    }
}
