use crate::{
    CBox, SqliteDriver, SqlitePrepared, SqliteTransaction, error_message_from_ptr,
    extract::{extract_name, extract_value},
};
use async_stream::try_stream;
use datalite_core::{
    AsQuery, Connection, ConstraintRule, ConstraintViolation, Context, Driver, Error, Executor,
    Query, QueryResult, Result, RowLabeled, RowNames, RowsAffected, stream::Stream,
    truncate_long,
};
use libsqlite3_sys::*;
use std::{
    ffi::{CStr, CString, c_int},
    ptr,
    sync::{
        Arc,
        atomic::{AtomicPtr, Ordering},
    },
};
use tokio::task::spawn_blocking;

/// Milliseconds a statement waits on a locked database before failing.
pub const BUSY_TIMEOUT_MS: c_int = 5000;

pub struct SqliteConnection {
    pub(crate) connection: CBox<*mut sqlite3>,
}

/// Compile the first statement of `sql[offset..]`.
///
/// Returns the statement (null when only whitespace or comments are left) and the offset
/// of the text following it.
fn prepare_statement(
    connection: *mut sqlite3,
    sql: &CStr,
    offset: usize,
) -> anyhow::Result<(CBox<*mut sqlite3_stmt>, usize)> {
    let bytes = sql.to_bytes();
    let mut statement = CBox::new(ptr::null_mut(), |p| unsafe {
        sqlite3_finalize(p);
    });
    let mut tail = ptr::null();
    unsafe {
        let start = sql.as_ptr().add(offset);
        let rc = sqlite3_prepare_v2(
            connection,
            start,
            (bytes.len() - offset) as c_int,
            &mut *statement,
            &mut tail,
        );
        if rc != SQLITE_OK {
            return Err(anyhow::Error::msg(error_message_from_ptr(
                sqlite3_errmsg(connection),
            )));
        }
        let consumed = if tail.is_null() {
            bytes.len()
        } else {
            tail.offset_from(sql.as_ptr()) as usize
        };
        Ok((statement, consumed))
    }
}

/// The error of the last failed call on `connection`, with constraint breaches turned into a
/// [`ConstraintViolation`].
fn last_error(connection: *mut sqlite3) -> anyhow::Error {
    let (code, message) = unsafe {
        (
            sqlite3_extended_errcode(connection),
            error_message_from_ptr(sqlite3_errmsg(connection)),
        )
    };
    if code & 0xff != SQLITE_CONSTRAINT {
        return anyhow::Error::msg(message);
    }
    let rule = match code {
        SQLITE_CONSTRAINT_UNIQUE => ConstraintRule::Unique,
        SQLITE_CONSTRAINT_NOTNULL => ConstraintRule::NotNull,
        SQLITE_CONSTRAINT_PRIMARYKEY => ConstraintRule::PrimaryKey,
        SQLITE_CONSTRAINT_CHECK => ConstraintRule::Check,
        _ => ConstraintRule::Other,
    };
    anyhow::Error::new(ConstraintViolation {
        rule,
        column: constraint_column(&message),
        message,
    })
}

/// Column named by a constraint message, `UNIQUE constraint failed: person.email` gives
/// `person.email`.
fn constraint_column(message: &str) -> Option<String> {
    let (_, columns) = message.split_once(": ")?;
    columns
        .split(',')
        .next()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(Into::into)
}

fn is_insert(sql: &str) -> bool {
    let sql = sql.trim_start();
    sql.get(..6)
        .is_some_and(|v| v.eq_ignore_ascii_case("INSERT"))
        || sql
            .get(..7)
            .is_some_and(|v| v.eq_ignore_ascii_case("REPLACE"))
}

impl SqliteConnection {
    fn handle(&self) -> *mut sqlite3 {
        *self.connection
    }

    fn changes(&self) -> i64 {
        unsafe { sqlite3_total_changes64(self.handle()) }
    }

    fn labels(statement: &CBox<*mut sqlite3_stmt>) -> Result<RowNames> {
        let count = unsafe { sqlite3_column_count(**statement) };
        (0..count)
            .map(|i| extract_name(**statement, i))
            .collect::<Result<Arc<[_]>>>()
    }

    /// Advance `statement`, returning the next row or `None` once it is done.
    fn step(
        &self,
        statement: &CBox<*mut sqlite3_stmt>,
        labels: &RowNames,
    ) -> Result<Option<RowLabeled>> {
        match unsafe { sqlite3_step(**statement) } {
            SQLITE_ROW => {
                let values = (0..labels.len() as c_int)
                    .map(|i| extract_value(**statement, i))
                    .collect::<Result<_>>()?;
                Ok(Some(RowLabeled::new(labels.clone(), values)))
            }
            SQLITE_DONE => {
                unsafe { sqlite3_reset(**statement) };
                Ok(None)
            }
            _ => {
                let error = last_error(self.handle());
                unsafe { sqlite3_reset(**statement) };
                let sql = unsafe { CStr::from_ptr(sqlite3_sql(**statement)) };
                let error = error.context(format!(
                    "While executing the query:\n{}",
                    truncate_long!(sql.to_string_lossy())
                ));
                log::error!("{:#}", error);
                Err(error.into())
            }
        }
    }

    /// Outcome of the statement that just completed.
    fn affected(&self, statement: &CBox<*mut sqlite3_stmt>, changes_before: i64) -> RowsAffected {
        let sql = unsafe { CStr::from_ptr(sqlite3_sql(**statement)) };
        let rows_affected = (self.changes() - changes_before).max(0) as u64;
        let last_affected_id = (rows_affected > 0 && is_insert(&sql.to_string_lossy()))
            .then(|| unsafe { sqlite3_last_insert_rowid(self.handle()) });
        RowsAffected {
            rows_affected,
            last_affected_id,
        }
    }

    /// Run one compiled statement to completion: its rows, then its outcome if it has no
    /// result columns.
    fn run_statement<'s>(
        &'s self,
        statement: &'s CBox<*mut sqlite3_stmt>,
    ) -> impl Stream<Item = Result<QueryResult>> + Send + 's {
        try_stream! {
            unsafe { sqlite3_reset(**statement) };
            let labels = Self::labels(statement)?;
            let changes_before = self.changes();
            while let Some(row) = self.step(statement, &labels)? {
                yield QueryResult::Row(row);
            }
            if labels.is_empty() {
                yield QueryResult::Affected(self.affected(statement, changes_before));
            }
        }
    }

    /// Compile a statement on a blocking thread.
    async fn compile(
        &self,
        sql: Arc<CString>,
        offset: usize,
    ) -> anyhow::Result<(CBox<*mut sqlite3_stmt>, usize)> {
        let connection = AtomicPtr::new(self.handle());
        spawn_blocking(move || {
            prepare_statement(connection.load(Ordering::Relaxed), &sql, offset)
        })
        .await
        .context("The prepare task failed")?
    }

    /// Run every statement of `sql` in order.
    fn run_unprepared<'s>(
        &'s self,
        sql: String,
    ) -> impl Stream<Item = Result<QueryResult>> + Send + 's {
        try_stream! {
            log::debug!("{}", truncate_long!(sql));
            let context = || format!("While running the query:\n{}", truncate_long!(sql));
            let text = Arc::new(CString::new(sql.as_bytes()).with_context(context)?);
            let len = text.as_bytes().len();
            let mut offset = 0;
            while offset < len {
                let (statement, next) = self
                    .compile(text.clone(), offset)
                    .await
                    .with_context(context)
                    .inspect_err(|e| log::error!("{:#}", e))?;
                if next <= offset {
                    break;
                }
                offset = next;
                if statement.is_null() {
                    continue;
                }
                for await value in self.run_statement(&statement) {
                    yield value?;
                }
            }
        }
    }
}

impl Executor for SqliteConnection {
    type Driver = SqliteDriver;

    fn driver(&self) -> &Self::Driver {
        &SqliteDriver
    }

    async fn prepare(&mut self, query: String) -> Result<Query<SqliteDriver>> {
        log::debug!("Preparing {}", truncate_long!(query));
        let context = || format!("While preparing the query:\n{}", truncate_long!(query));
        let sql = Arc::new(CString::new(query.as_bytes()).with_context(context)?);
        let (statement, consumed) = self
            .compile(sql.clone(), 0)
            .await
            .with_context(context)
            .inspect_err(|e| log::error!("{:#}", e))?;
        if statement.is_null() {
            let error = anyhow::Error::msg("The query contains no statement").context(context());
            log::error!("{:#}", error);
            return Err(error.into());
        }
        if !sql.as_bytes()[consumed..].iter().all(u8::is_ascii_whitespace) {
            let error = anyhow::Error::msg("Cannot prepare more than one statement at a time")
                .context(context());
            log::error!("{:#}", error);
            return Err(error.into());
        }
        Ok(Query::Prepared(SqlitePrepared::new(statement)))
    }

    fn run<'s>(
        &'s mut self,
        query: impl AsQuery<SqliteDriver> + 's,
    ) -> impl Stream<Item = Result<QueryResult>> + Send + 's {
        let mut query = query.as_query();
        try_stream! {
            match query.as_mut() {
                Query::Raw(sql) => {
                    for await value in self.run_unprepared(std::mem::take(sql)) {
                        yield value?;
                    }
                }
                Query::Prepared(prepared) => {
                    log::debug!("Running {}", prepared);
                    for await value in self.run_statement(&prepared.statement) {
                        yield value?;
                    }
                }
            }
        }
    }
}

impl Connection for SqliteConnection {
    /// Open `sqlite://<path>?<options>`, `sqlite://:memory:` for a private in memory database.
    ///
    /// The location is opened as an SQLite URI filename (`file:<path>?<options>`), so options
    /// like `mode=ro` or `mode=rwc` are honored.
    async fn connect(url: &str) -> Result<SqliteConnection> {
        let prefix = format!("{}://", SqliteDriver::NAME);
        let Some(location) = url.strip_prefix(&prefix) else {
            let error = Error::msg(format!(
                "Expected the sqlite connection url `{}` to start with `{}`",
                url, prefix
            ));
            log::error!("{}", error);
            return Err(error);
        };
        let filename = CString::new(format!("file:{}", location))
            .with_context(|| format!("Error while decoding connection URL: `{}`", url))?;
        let mut connection = CBox::new(ptr::null_mut(), |p| unsafe {
            sqlite3_close(p);
        });
        unsafe {
            let rc = sqlite3_open_v2(
                filename.as_ptr(),
                &mut *connection,
                SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE | SQLITE_OPEN_URI,
                ptr::null(),
            );
            if rc != SQLITE_OK {
                let message = if connection.is_null() {
                    "out of memory".to_string()
                } else {
                    error_message_from_ptr(sqlite3_errmsg(*connection))
                };
                let error = anyhow::Error::msg(message)
                    .context(format!("Could not open the database `{}`", url));
                log::error!("{:#}", error);
                return Err(error.into());
            }
            sqlite3_busy_timeout(*connection, BUSY_TIMEOUT_MS);
        }
        log::debug!("Opened `{}`", url);
        Ok(Self { connection })
    }

    fn begin(&mut self) -> impl Future<Output = Result<SqliteTransaction<'_>>> + Send {
        SqliteTransaction::new(self)
    }
}
