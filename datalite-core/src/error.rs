use crate::ConstraintRule;
use std::fmt::Display;
use thiserror::Error;

/// Every failure surfaced by the persistence engine.
#[derive(Debug, Error)]
pub enum Error {
    /// The record type cannot be mapped onto a table.
    #[error("cannot map `{type_name}`: {reason}")]
    Schema {
        type_name: &'static str,
        reason: String,
    },

    /// A column rule (unique, not null, ..) rejected the write.
    #[error("{rule} constraint failed on table `{table}`{}", describe_column(.column))]
    ConstraintFailed {
        table: String,
        rule: ConstraintRule,
        column: Option<String>,
    },

    /// The operation requires an instance state it does not have (usually an identity).
    #[error("invalid state: {0}")]
    State(String),

    /// Any other storage failure, as reported by the driver.
    #[error(transparent)]
    Persistence(#[from] anyhow::Error),

    /// The migration could not plan or copy the table, the original table is intact.
    #[error("migration of `{table}` failed{}{}: {source}", describe_row(.row), describe_column(.column))]
    Migration {
        table: String,
        row: Option<i64>,
        column: Option<String>,
        source: Box<Error>,
    },
}

/// Convenience alias for results with [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Storage error carrying just a message.
    pub fn msg<M>(message: M) -> Self
    where
        M: Display + std::fmt::Debug + Send + Sync + 'static,
    {
        Error::Persistence(anyhow::Error::msg(message))
    }

    pub fn is_constraint_failed(&self) -> bool {
        matches!(self, Error::ConstraintFailed { .. })
    }

    pub(crate) fn schema(type_name: &'static str, reason: impl Into<String>) -> Self {
        Error::Schema {
            type_name,
            reason: reason.into(),
        }
    }

    pub(crate) fn migration(
        table: impl Into<String>,
        row: Option<i64>,
        column: Option<&str>,
        source: Error,
    ) -> Self {
        Error::Migration {
            table: table.into(),
            row,
            column: column.map(Into::into),
            source: Box::new(source),
        }
    }
}

fn describe_column(column: &Option<String>) -> String {
    column
        .as_ref()
        .map(|v| format!(", column `{v}`"))
        .unwrap_or_default()
}

fn describe_row(row: &Option<i64>) -> String {
    row.map(|v| format!(" at row {v}")).unwrap_or_default()
}
