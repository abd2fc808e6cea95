use crate::{CBox, error_message_from_ptr};
use datalite_core::{
    AsValue, Error, Prepared, Result, Value,
    temporal::{format_date, format_time, format_timestamp},
    truncate_long,
};
use libsqlite3_sys::*;
use std::{
    ffi::{CStr, c_int},
    fmt::{self, Display},
    os::raw::{c_char, c_void},
};

pub struct SqlitePrepared {
    pub(crate) statement: CBox<*mut sqlite3_stmt>,
    pub(crate) index: u64,
}

impl SqlitePrepared {
    pub(crate) fn new(statement: CBox<*mut sqlite3_stmt>) -> Self {
        Self {
            statement,
            index: 1,
        }
    }

    /// SQL text the statement was prepared from.
    pub fn sql(&self) -> String {
        unsafe {
            let sql = sqlite3_sql(*self.statement);
            if sql.is_null() {
                return String::new();
            }
            CStr::from_ptr(sql).to_string_lossy().into_owned()
        }
    }

    fn bind_text(&mut self, index: c_int, text: &str) -> c_int {
        unsafe {
            sqlite3_bind_text(
                *self.statement,
                index,
                text.as_ptr() as *const c_char,
                text.len() as c_int,
                SQLITE_TRANSIENT(),
            )
        }
    }

    fn error(&self, index: c_int, message: String) -> Error {
        let error = Error::from(anyhow::Error::msg(message).context(format!(
            "Cannot bind parameter {} to query:\n{}",
            index,
            truncate_long!(self.sql())
        )));
        log::error!("{:#}", error);
        error
    }
}

impl Prepared for SqlitePrepared {
    fn clear_bindings(&mut self) -> Result<&mut Self> {
        unsafe {
            sqlite3_reset(*self.statement);
            sqlite3_clear_bindings(*self.statement);
        }
        self.index = 1;
        Ok(self)
    }

    fn bind(&mut self, value: impl AsValue) -> Result<&mut Self> {
        let index = self.index;
        self.bind_index(value, index)
    }

    fn bind_index(&mut self, value: impl AsValue, index: u64) -> Result<&mut Self> {
        let index = index as c_int;
        let value = value.as_value();
        let statement = *self.statement;
        let rc = unsafe {
            match value {
                ref v if v.is_null() => sqlite3_bind_null(statement, index),
                Value::Boolean(Some(v)) => sqlite3_bind_int(statement, index, v as c_int),
                Value::Int8(Some(v)) => sqlite3_bind_int(statement, index, v as c_int),
                Value::Int16(Some(v)) => sqlite3_bind_int(statement, index, v as c_int),
                Value::Int32(Some(v)) => sqlite3_bind_int(statement, index, v as c_int),
                Value::Int64(Some(v)) => sqlite3_bind_int64(statement, index, v),
                Value::UInt8(Some(v)) => sqlite3_bind_int(statement, index, v as c_int),
                Value::UInt16(Some(v)) => sqlite3_bind_int(statement, index, v as c_int),
                Value::UInt32(Some(v)) => sqlite3_bind_int64(statement, index, v as sqlite3_int64),
                Value::UInt64(Some(v)) => {
                    let Ok(v) = sqlite3_int64::try_from(v) else {
                        return Err(self.error(
                            index,
                            format!("The value {} is out of the range of a sqlite integer", v),
                        ));
                    };
                    sqlite3_bind_int64(statement, index, v)
                }
                Value::Float32(Some(v)) => sqlite3_bind_double(statement, index, v as f64),
                Value::Float64(Some(v)) => sqlite3_bind_double(statement, index, v),
                Value::Varchar(Some(ref v)) => self.bind_text(index, v),
                Value::Blob(Some(ref v)) => sqlite3_bind_blob(
                    statement,
                    index,
                    v.as_ptr() as *const c_void,
                    v.len() as c_int,
                    SQLITE_TRANSIENT(),
                ),
                Value::Date(Some(ref v)) => self.bind_text(index, &format_date(v)?),
                Value::Time(Some(ref v)) => self.bind_text(index, &format_time(v)?),
                Value::Timestamp(Some(ref v)) => self.bind_text(index, &format_timestamp(v)?),
                Value::Uuid(Some(v)) => self.bind_text(index, &v.to_string()),
                _ => {
                    return Err(self.error(
                        index,
                        format!("Cannot use {:?} as a query parameter", value),
                    ));
                }
            }
        };
        if rc != SQLITE_OK {
            let message = unsafe {
                error_message_from_ptr(sqlite3_errmsg(sqlite3_db_handle(statement)))
            };
            return Err(self.error(index, message));
        }
        self.index = index as u64 + 1;
        Ok(self)
    }
}

impl Display for SqlitePrepared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&truncate_long!(self.sql()))
    }
}
