use crate::{
    AsQuery, Driver, Query, QueryResult, Result, RowLabeled, RowsAffected,
    stream::{Stream, TryStreamExt},
};
use std::future;

/// Something SQL runs on: a connection or a transaction opened on one.
///
/// Every engine operation borrows its executor mutably, one operation runs at a time.
pub trait Executor: Send + Sized {
    type Driver: Driver;

    fn driver(&self) -> &Self::Driver;

    /// Compile a single statement, to be bound and run any number of times.
    fn prepare(
        &mut self,
        query: String,
    ) -> impl Future<Output = Result<Query<Self::Driver>>> + Send;

    /// Run `query`, yielding its rows and the outcome of each modifying statement in order.
    fn run<'s>(
        &'s mut self,
        query: impl AsQuery<Self::Driver> + 's,
    ) -> impl Stream<Item = Result<QueryResult>> + Send + 's;

    /// Only the rows of [`Executor::run`].
    fn fetch<'s>(
        &'s mut self,
        query: impl AsQuery<Self::Driver> + 's,
    ) -> impl Stream<Item = Result<RowLabeled>> + Send + 's {
        self.run(query).try_filter_map(|v| {
            future::ready(Ok(match v {
                QueryResult::Row(row) => Some(row),
                QueryResult::Affected(..) => None,
            }))
        })
    }

    /// The outcomes of [`Executor::run`] summed up, rows are discarded.
    fn execute<'s>(
        &'s mut self,
        query: impl AsQuery<Self::Driver> + 's,
    ) -> impl Future<Output = Result<RowsAffected>> + Send + 's {
        self.run(query)
            .try_filter_map(|v| {
                future::ready(Ok(match v {
                    QueryResult::Affected(affected) => Some(affected),
                    QueryResult::Row(..) => None,
                }))
            })
            .try_collect()
    }
}
