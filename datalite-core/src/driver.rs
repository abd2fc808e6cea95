use crate::{Connection, Prepared, Result, SqlWriter, Transaction};
use std::fmt::Debug;

/// Entry point of a storage backend, tying together its connection, transaction, prepared
/// statement and SQL dialect types.
pub trait Driver: Debug + Send + Sync + Sized + 'static {
    type Connection: Connection<Driver = Self>;
    type SqlWriter: SqlWriter;
    type Prepared: Prepared;
    type Transaction<'c>: Transaction<'c, Driver = Self>;

    /// Scheme of the connection urls this driver accepts (`sqlite` for `sqlite://..`).
    const NAME: &'static str;

    fn sql_writer(&self) -> Self::SqlWriter;

    fn connect(&self, url: &str) -> impl Future<Output = Result<Self::Connection>> + Send {
        Self::Connection::connect(url)
    }
}
