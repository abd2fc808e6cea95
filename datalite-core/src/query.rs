use crate::{AsValue, Driver, Error, Prepared, Result, Value, truncate_long};
use std::sync::Arc;

/// A statement ready to be sent to an [`Executor`](crate::Executor).
///
/// Either raw SQL text, possibly holding several statements, or a single statement prepared
/// by the driver with bound parameters.
#[derive(Debug)]
pub enum Query<D: Driver> {
    Raw(String),
    Prepared(D::Prepared),
}

impl<D: Driver> Query<D> {
    /// Reset every parameter, the next `bind` sets the first one again.
    pub fn clear_bindings(&mut self) -> Result<&mut Self> {
        self.prepared("clear the bindings of")?.clear_bindings()?;
        Ok(self)
    }
    /// Bind the next parameter.
    pub fn bind(&mut self, value: impl AsValue) -> Result<&mut Self> {
        self.prepared("bind")?.bind(value)?;
        Ok(self)
    }
    /// Bind the values of a row to the parameters, in order.
    pub fn bind_row(&mut self, row: impl IntoIterator<Item = Value>) -> Result<&mut Self> {
        for value in row {
            self.bind(value)?;
        }
        Ok(self)
    }
    fn prepared(&mut self, action: &str) -> Result<&mut D::Prepared> {
        match self {
            Query::Prepared(prepared) => Ok(prepared),
            Query::Raw(sql) => Err(Error::msg(format!(
                "Cannot {} the raw query `{}`, it must be prepared first",
                action,
                truncate_long!(sql)
            ))),
        }
    }
}

/// Anything an [`Executor`](crate::Executor) can run: SQL text, an owned query or a
/// borrowed prepared one that is reused afterwards.
pub trait AsQuery<D: Driver>: Send {
    type Output: AsMut<Query<D>> + Send;
    fn as_query(self) -> Self::Output;
}

impl<D: Driver> AsQuery<D> for Query<D> {
    type Output = Query<D>;
    fn as_query(self) -> Self::Output {
        self
    }
}

impl<'q, D: Driver + 'q> AsQuery<D> for &'q mut Query<D> {
    type Output = &'q mut Query<D>;
    fn as_query(self) -> Self::Output {
        self
    }
}

impl<D: Driver> AsQuery<D> for String {
    type Output = Query<D>;
    fn as_query(self) -> Self::Output {
        Query::Raw(self)
    }
}

impl<D: Driver> AsQuery<D> for &str {
    type Output = Query<D>;
    fn as_query(self) -> Self::Output {
        Query::Raw(self.to_owned())
    }
}

impl<D: Driver> AsMut<Query<D>> for Query<D> {
    fn as_mut(&mut self) -> &mut Query<D> {
        self
    }
}

/// Outcome of a modify statement (INSERT/UPDATE/DELETE).
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowsAffected {
    /// Total number of rows impacted.
    pub rows_affected: u64,
    /// Identity of the last inserted row, when the statement inserted something.
    pub last_affected_id: Option<i64>,
}

/// Shared column name list.
pub type RowNames = Arc<[String]>;
/// Row values, aligned by index with `RowNames`.
pub type Row = Box<[Value]>;

/// A result row with its column labels.
#[derive(Debug, Clone)]
pub struct RowLabeled {
    pub labels: RowNames,
    pub values: Row,
}

impl RowLabeled {
    pub fn new(labels: RowNames, values: Row) -> Self {
        Self { labels, values }
    }
    pub fn names(&self) -> &[String] {
        &self.labels
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
    pub fn get_column(&self, name: &str) -> Option<&Value> {
        self.labels
            .iter()
            .position(|v| v == name)
            .map(|i| &self.values()[i])
    }
}

/// Items emitted by `Executor::run`: rows and modify outcomes, in statement order.
#[derive(Debug)]
pub enum QueryResult {
    Row(RowLabeled),
    Affected(RowsAffected),
}

impl Extend<RowsAffected> for RowsAffected {
    fn extend<T: IntoIterator<Item = RowsAffected>>(&mut self, iter: T) {
        for elem in iter {
            self.rows_affected += elem.rows_affected;
            if elem.last_affected_id.is_some() {
                self.last_affected_id = elem.last_affected_id;
            }
        }
    }
}

impl From<RowLabeled> for QueryResult {
    fn from(value: RowLabeled) -> Self {
        QueryResult::Row(value)
    }
}

impl From<RowsAffected> for QueryResult {
    fn from(value: RowsAffected) -> Self {
        QueryResult::Affected(value)
    }
}
