use crate::{Entity, Error, IDENTITY_COLUMN, Result, StorageClass, TypeDescriptor, Value};
use std::{
    any::TypeId,
    collections::{HashMap, HashSet},
    sync::{LazyLock, PoisonError, RwLock},
};

/// Column of a table, as created in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: &'static str,
    /// Semantic type prototype.
    pub value: Value,
    pub storage: StorageClass,
    pub nullable: bool,
    pub unique: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub default: Option<Value>,
}

impl ColumnDef {
    /// The implicit identity column.
    pub fn identity() -> Self {
        Self {
            name: IDENTITY_COLUMN,
            value: Value::Int64(None),
            storage: StorageClass::Integer,
            nullable: false,
            unique: true,
            primary_key: true,
            auto_increment: true,
            default: None,
        }
    }
    pub fn is_identity(&self) -> bool {
        self.primary_key && self.name == IDENTITY_COLUMN
    }
}

/// Table layout derived from a record type.
///
/// Column 0 is always the identity column, the declared fields follow in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub table: &'static str,
    pub type_name: &'static str,
    pub columns: Vec<ColumnDef>,
}

impl Schema {
    /// Derive the schema of `E`, without going through the cache.
    pub fn derive<E: Entity>() -> Result<Schema> {
        Self::from_descriptor(&TypeDescriptor::of::<E>())
    }

    pub fn from_descriptor(descriptor: &TypeDescriptor) -> Result<Schema> {
        let type_name = descriptor.type_name;
        let mut names = HashSet::with_capacity(descriptor.fields.len());
        let mut columns = Vec::with_capacity(descriptor.fields.len() + 1);
        columns.push(ColumnDef::identity());
        for field in descriptor.fields {
            if field.name.eq_ignore_ascii_case(IDENTITY_COLUMN) {
                return Err(Error::schema(
                    type_name,
                    format!("the name `{IDENTITY_COLUMN}` is reserved for the identity column"),
                ));
            }
            if field.name.is_empty() {
                return Err(Error::schema(type_name, "a field has an empty column name"));
            }
            if !names.insert(field.name.to_ascii_lowercase()) {
                return Err(Error::schema(
                    type_name,
                    format!("the column `{}` is declared more than once", field.name),
                ));
            }
            let Some(storage) = field.value.storage_class() else {
                return Err(Error::schema(
                    type_name,
                    format!("the field `{}` has no storable type", field.name),
                ));
            };
            let nullable = field.nullable && !field.unique && !field.not_null;
            let default = match &field.default {
                Some(v) if v.is_null() && !nullable => {
                    return Err(Error::schema(
                        type_name,
                        format!("the non nullable field `{}` has a null default", field.name),
                    ));
                }
                Some(v) if !v.is_null() && !v.same_type(&field.value) => {
                    return Err(Error::schema(
                        type_name,
                        format!(
                            "the default of `{}` is {:?}, which does not match its type {:?}",
                            field.name, v, field.value
                        ),
                    ));
                }
                v => v.clone(),
            };
            columns.push(ColumnDef {
                name: field.name,
                value: field.value.as_null(),
                storage,
                nullable,
                unique: field.unique,
                primary_key: false,
                auto_increment: false,
                default,
            });
        }
        Ok(Schema {
            table: descriptor.table_name,
            type_name,
            columns,
        })
    }

    pub fn identity(&self) -> &ColumnDef {
        &self.columns[0]
    }

    /// Declared columns, identity excluded.
    pub fn fields(&self) -> &[ColumnDef] {
        &self.columns[1..]
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    /// The column named `name`, or a schema error naming the record type.
    pub fn require_column(&self, name: &str) -> Result<&ColumnDef> {
        self.column(name).ok_or_else(|| {
            Error::schema(
                self.type_name,
                format!("`{}` has no column named `{}`", self.table, name),
            )
        })
    }
}

static SCHEMAS: LazyLock<RwLock<HashMap<TypeId, &'static Schema>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// The schema of `E`, derived on first use and cached for the life of the process.
///
/// Concurrent first uses may derive the schema more than once, the first one stored wins.
pub fn schema_of<E: Entity>() -> Result<&'static Schema> {
    let key = TypeId::of::<E>();
    if let Some(schema) = SCHEMAS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return Ok(*schema);
    }
    let schema = Schema::derive::<E>()?;
    let mut schemas = SCHEMAS.write().unwrap_or_else(PoisonError::into_inner);
    Ok(*schemas
        .entry(key)
        .or_insert_with(|| &*Box::leak(Box::new(schema))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldDef, Identity, Row, RowLabeled};

    #[derive(Debug, Default)]
    struct Person {
        id: Identity,
        name: String,
        email: Option<String>,
        nickname: Option<String>,
    }

    static PERSON_FIELDS: LazyLock<Box<[FieldDef]>> = LazyLock::new(|| {
        vec![
            FieldDef::new("name", Value::Varchar(None)),
            FieldDef {
                nullable: true,
                unique: true,
                ..FieldDef::new("email", Value::Varchar(None))
            },
            FieldDef {
                nullable: true,
                default: Some(Value::Varchar(Some("anon".into()))),
                ..FieldDef::new("nickname", Value::Varchar(None))
            },
        ]
        .into_boxed_slice()
    });

    impl Entity for Person {
        fn table_name() -> &'static str {
            "person"
        }
        fn fields() -> &'static [FieldDef] {
            &PERSON_FIELDS
        }
        fn identity(&self) -> Identity {
            self.id
        }
        fn set_identity(&mut self, identity: Identity) {
            self.id = identity;
        }
        fn row(&self) -> Row {
            [
                Value::Varchar(Some(self.name.clone())),
                Value::Varchar(self.email.clone()),
                Value::Varchar(self.nickname.clone()),
            ]
            .into()
        }
        fn from_row(_row: RowLabeled) -> Result<Self> {
            Ok(Person::default())
        }
    }

    fn descriptor(fields: Vec<FieldDef>) -> TypeDescriptor {
        TypeDescriptor {
            type_name: "Broken",
            table_name: "broken",
            fields: Vec::leak(fields),
        }
    }

    #[test]
    fn derive_columns() {
        let schema = Schema::derive::<Person>().unwrap();
        assert_eq!(schema.table, "person");
        assert_eq!(
            schema.column_names().collect::<Vec<_>>(),
            ["obj_id", "name", "email", "nickname"]
        );
        let identity = schema.identity();
        assert!(identity.is_identity());
        assert!(identity.auto_increment);
        assert!(!identity.nullable);
        assert_eq!(schema.fields().len(), 3);

        let name = schema.column("name").unwrap();
        assert!(!name.nullable);
        assert!(!name.unique);
        assert_eq!(name.storage, StorageClass::Text);

        // Unique implies not null, even for optional fields
        let email = schema.column("email").unwrap();
        assert!(email.unique);
        assert!(!email.nullable);

        let nickname = schema.column("nickname").unwrap();
        assert!(nickname.nullable);
        assert_eq!(nickname.default, Some(Value::Varchar(Some("anon".into()))));

        assert!(schema.require_column("age").is_err());
    }

    #[test]
    fn cache_returns_the_same_schema() {
        let a = schema_of::<Person>().unwrap();
        let b = Person::schema().unwrap();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn reserved_name() {
        let error =
            Schema::from_descriptor(&descriptor(vec![FieldDef::new("obj_id", Value::Int64(None))]))
                .unwrap_err();
        assert!(matches!(error, Error::Schema { .. }));
        assert!(error.to_string().contains("reserved"), "{error}");
    }

    #[test]
    fn duplicate_name() {
        let error = Schema::from_descriptor(&descriptor(vec![
            FieldDef::new("a", Value::Int64(None)),
            FieldDef::new("b", Value::Int64(None)),
            FieldDef::new("a", Value::Varchar(None)),
        ]))
        .unwrap_err();
        assert!(error.to_string().contains("more than once"), "{error}");
    }

    #[test]
    fn untyped_field() {
        let error = Schema::from_descriptor(&descriptor(vec![FieldDef::new("any", Value::Null)]))
            .unwrap_err();
        assert!(matches!(error, Error::Schema { type_name: "Broken", .. }));
    }

    #[test]
    fn mismatched_default() {
        let error = Schema::from_descriptor(&descriptor(vec![FieldDef {
            default: Some(Value::Varchar(Some("one".into()))),
            ..FieldDef::new("count", Value::Int32(None))
        }]))
        .unwrap_err();
        assert!(error.to_string().contains("does not match"), "{error}");

        let error = Schema::from_descriptor(&descriptor(vec![FieldDef {
            default: Some(Value::Int32(None)),
            ..FieldDef::new("count", Value::Int32(None))
        }]))
        .unwrap_err();
        assert!(error.to_string().contains("null default"), "{error}");
    }
}
