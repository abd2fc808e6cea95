use crate::{SqliteConnection, SqliteDriver, error_message_from_ptr};
use datalite_core::{
    AsQuery, Driver, Executor, Query, QueryResult, Result, SqlWriter, Transaction,
    stream::Stream,
};
use libsqlite3_sys::{SQLITE_OK, sqlite3_errmsg, sqlite3_exec, sqlite3_get_autocommit};
use std::{ffi::CString, ptr};

/// A transaction on a [`SqliteConnection`].
///
/// Dropping it before `commit` or `rollback` succeeded rolls it back.
pub struct SqliteTransaction<'c> {
    connection: &'c mut SqliteConnection,
    finished: bool,
}

impl<'c> SqliteTransaction<'c> {
    pub async fn new(connection: &'c mut SqliteConnection) -> Result<Self> {
        let mut sql = String::new();
        connection
            .driver()
            .sql_writer()
            .write_transaction_begin(&mut sql);
        connection.execute(sql).await?;
        Ok(Self {
            connection,
            finished: false,
        })
    }

    async fn finish(mut self, sql: String) -> Result<()> {
        self.connection.execute(sql).await?;
        self.finished = true;
        Ok(())
    }
}

impl<'c> Executor for SqliteTransaction<'c> {
    type Driver = SqliteDriver;

    fn driver(&self) -> &SqliteDriver {
        self.connection.driver()
    }

    fn prepare(
        &mut self,
        query: String,
    ) -> impl Future<Output = Result<Query<SqliteDriver>>> + Send {
        self.connection.prepare(query)
    }

    fn run<'s>(
        &'s mut self,
        query: impl AsQuery<SqliteDriver> + 's,
    ) -> impl Stream<Item = Result<QueryResult>> + Send + 's {
        self.connection.run(query)
    }
}

impl<'c> Transaction<'c> for SqliteTransaction<'c> {
    fn commit(self) -> impl Future<Output = Result<()>> + Send {
        let mut sql = String::new();
        self.driver()
            .sql_writer()
            .write_transaction_commit(&mut sql);
        self.finish(sql)
    }

    fn rollback(self) -> impl Future<Output = Result<()>> + Send {
        let mut sql = String::new();
        self.driver()
            .sql_writer()
            .write_transaction_rollback(&mut sql);
        self.finish(sql)
    }
}

impl<'c> Drop for SqliteTransaction<'c> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let connection = *self.connection.connection;
        // Nothing to undo when sqlite already ended the transaction
        if unsafe { sqlite3_get_autocommit(connection) } != 0 {
            return;
        }
        let mut sql = String::new();
        self.connection
            .driver()
            .sql_writer()
            .write_transaction_rollback(&mut sql);
        let Ok(sql) = CString::new(sql) else {
            return;
        };
        log::warn!("Rolling back a transaction that was dropped unfinished");
        let rc = unsafe {
            sqlite3_exec(connection, sql.as_ptr(), None, ptr::null_mut(), ptr::null_mut())
        };
        if rc != SQLITE_OK {
            log::error!(
                "Could not roll back the dropped transaction: {}",
                error_message_from_ptr(unsafe { sqlite3_errmsg(connection) })
            );
        }
    }
}
