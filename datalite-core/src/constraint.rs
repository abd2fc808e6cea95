use crate::{Error, Schema};
use std::fmt::{self, Display, Formatter};

/// Kind of column rule a write can break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintRule {
    Unique,
    NotNull,
    PrimaryKey,
    Check,
    Other,
}

impl Display for ConstraintRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConstraintRule::Unique => "UNIQUE",
            ConstraintRule::NotNull => "NOT NULL",
            ConstraintRule::PrimaryKey => "PRIMARY KEY",
            ConstraintRule::Check => "CHECK",
            ConstraintRule::Other => "constraint",
        })
    }
}

/// Signal raised by a driver when the store rejects a write because of a column rule.
///
/// Drivers attach it to the `anyhow` chain of the persistence error. [`normalize`] then finds
/// it and turns the whole error into [`Error::ConstraintFailed`].
#[derive(Debug, thiserror::Error)]
#[error("{rule} constraint violated: {message}")]
pub struct ConstraintViolation {
    pub rule: ConstraintRule,
    pub column: Option<String>,
    pub message: String,
}

/// Translate a driver constraint violation into the typed [`Error::ConstraintFailed`].
///
/// Every other error is returned unchanged.
pub fn normalize(schema: &Schema, error: Error) -> Error {
    let Error::Persistence(e) = error else {
        return error;
    };
    let found = e
        .chain()
        .find_map(|v| v.downcast_ref::<ConstraintViolation>())
        .map(|v| (v.rule, v.column.clone()));
    match found {
        Some((rule, column)) => Error::ConstraintFailed {
            table: schema.table.to_owned(),
            rule,
            column: column.map(|c| {
                // Drivers may report the column qualified by its table
                c.rsplit('.').next().unwrap_or(&c).to_owned()
            }),
        },
        None => Error::Persistence(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColumnDef, StorageClass, Value};

    fn schema() -> Schema {
        Schema {
            table: "person",
            type_name: "Person",
            columns: vec![
                ColumnDef::identity(),
                ColumnDef {
                    name: "email",
                    value: Value::Varchar(None),
                    storage: StorageClass::Text,
                    nullable: false,
                    unique: true,
                    primary_key: false,
                    auto_increment: false,
                    default: None,
                },
            ],
        }
    }

    #[test]
    fn violation_in_chain_is_normalized() {
        let error: anyhow::Error = ConstraintViolation {
            rule: ConstraintRule::Unique,
            column: Some("person.email".into()),
            message: "UNIQUE constraint failed: person.email".into(),
        }
        .into();
        let error = error.context("While executing the query");
        let normalized = normalize(&schema(), Error::Persistence(error));
        match normalized {
            Error::ConstraintFailed {
                table,
                rule,
                column,
            } => {
                assert_eq!(table, "person");
                assert_eq!(rule, ConstraintRule::Unique);
                assert_eq!(column.as_deref(), Some("email"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn other_errors_pass_through() {
        let normalized = normalize(&schema(), Error::msg("disk I/O error"));
        assert!(matches!(normalized, Error::Persistence(..)));
        assert_eq!(normalized.to_string(), "disk I/O error");
        let normalized = normalize(&schema(), Error::State("not persisted".into()));
        assert!(matches!(normalized, Error::State(..)));
    }

    #[test]
    fn failed_message() {
        let error = Error::ConstraintFailed {
            table: "person".into(),
            rule: ConstraintRule::NotNull,
            column: Some("email".into()),
        };
        assert_eq!(
            error.to_string(),
            "NOT NULL constraint failed on table `person`, column `email`"
        );
    }
}
