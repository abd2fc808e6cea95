use crate::{Executor, Result};

/// A transaction borrowing its connection for `'c`.
///
/// Dropping it without calling `commit` or `rollback` rolls it back.
pub trait Transaction<'c>: Executor {
    fn commit(self) -> impl Future<Output = Result<()>> + Send;
    fn rollback(self) -> impl Future<Output = Result<()>> + Send;
}
