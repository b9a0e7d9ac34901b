//! SQLite driver for the data-access core.
//!
//! # Responsibility
//! - Open/close/dispose `rusqlite` connections from an opaque connection
//!   string (file path or `file:` URI).
//! - Bind `Parameters` to prepared statements and expose rows as `Record`.
//!
//! # Invariants
//! - Opened connections have `foreign_keys=ON` and a busy timeout.
//! - A disposed connection never opens again.
//! - Parameters bind by name when the statement declares named placeholders
//!   and by insertion position when it declares only positional ones.

use crate::db::connection::{ConnectionState, Connector, DriverConnection};
use crate::db::params::Parameters;
use crate::db::record::Record;
use crate::db::value::SqlValue;
use crate::db::{DbError, DbResult};
use log::{debug, error};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{OpenFlags, Row, Statement};
use std::time::{Duration, Instant};

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const PARAMETER_SIGILS: [char; 3] = ['@', ':', '$'];

/// Produces unopened SQLite connections for one connection string.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    connection_string: String,
    busy_timeout: Duration,
}

impl SqliteConnector {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }
}

impl Connector for SqliteConnector {
    type Connection = SqliteConnection;

    fn connect(&self) -> SqliteConnection {
        SqliteConnection::new(self.connection_string.clone(), self.busy_timeout)
    }
}

/// A closable, reopenable SQLite connection handle.
pub struct SqliteConnection {
    connection_string: String,
    busy_timeout: Duration,
    inner: Option<rusqlite::Connection>,
    disposed: bool,
}

impl SqliteConnection {
    pub fn new(connection_string: impl Into<String>, busy_timeout: Duration) -> Self {
        Self {
            connection_string: connection_string.into(),
            busy_timeout,
            inner: None,
            disposed: false,
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn connection(&self) -> DbResult<&rusqlite::Connection> {
        match self.inner.as_ref() {
            Some(conn) => Ok(conn),
            None if self.disposed => Err(DbError::ConnectionDisposed),
            None => Err(DbError::InvalidArgument(
                "connection is not open".to_string(),
            )),
        }
    }

    fn prepare<'c>(
        conn: &'c rusqlite::Connection,
        sql: &str,
        params: &Parameters,
    ) -> DbResult<Statement<'c>> {
        let mut stmt = conn.prepare(sql)?;
        bind_parameters(&mut stmt, params)?;
        Ok(stmt)
    }
}

impl DriverConnection for SqliteConnection {
    fn state(&self) -> ConnectionState {
        if self.inner.is_some() {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    fn open(&mut self) -> DbResult<()> {
        if self.disposed {
            return Err(DbError::ConnectionDisposed);
        }
        if self.inner.is_some() {
            return Ok(());
        }

        let started_at = Instant::now();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = rusqlite::Connection::open_with_flags(&self.connection_string, flags)
            .and_then(|conn| {
                conn.execute_batch("PRAGMA foreign_keys = ON;")?;
                conn.busy_timeout(self.busy_timeout)?;
                Ok(conn)
            });

        match conn {
            Ok(conn) => {
                debug!(
                    "event=db_open module=db status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                self.inner = Some(conn);
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=db_open module=db status=error duration_ms={} error_code=db_open_failed error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err.into())
            }
        }
    }

    fn close(&mut self) -> DbResult<()> {
        let Some(conn) = self.inner.take() else {
            return Ok(());
        };
        if let Err((conn, err)) = conn.close() {
            // Keep the handle so a later dispose still releases it.
            self.inner = Some(conn);
            return Err(err.into());
        }
        Ok(())
    }

    fn dispose(&mut self) -> DbResult<()> {
        self.disposed = true;
        self.inner = None;
        Ok(())
    }

    fn execute(&mut self, sql: &str, params: &Parameters) -> DbResult<usize> {
        let conn = self.connection()?;
        let mut stmt = Self::prepare(conn, sql, params)?;
        Ok(stmt.raw_execute()?)
    }

    fn query_value(&mut self, sql: &str, params: &Parameters) -> DbResult<Option<SqlValue>> {
        let conn = self.connection()?;
        let mut stmt = Self::prepare(conn, sql, params)?;
        let has_columns = stmt.column_count() > 0;
        let mut rows = stmt.raw_query();
        match rows.next()? {
            Some(row) if has_columns => Ok(Some(SqlValue::from(row.get_ref(0)?))),
            _ => Ok(None),
        }
    }

    fn for_each_row(
        &mut self,
        sql: &str,
        params: &Parameters,
        visit: &mut dyn FnMut(&dyn Record) -> DbResult<()>,
    ) -> DbResult<()> {
        let conn = self.connection()?;
        let mut stmt = Self::prepare(conn, sql, params)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next()? {
            visit(&SqliteRecord {
                columns: &columns,
                row,
            })?;
        }
        Ok(())
    }

    fn last_insert_id(&self) -> DbResult<i64> {
        Ok(self.connection()?.last_insert_rowid())
    }
}

struct SqliteRecord<'r, 'stmt> {
    columns: &'r [String],
    row: &'r Row<'stmt>,
}

impl Record for SqliteRecord<'_, '_> {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(String::as_str)
    }

    fn value_at(&self, index: usize) -> DbResult<SqlValue> {
        if index >= self.columns.len() {
            return Err(DbError::FieldNotFound(format!("#{index}")));
        }
        Ok(SqlValue::from(self.row.get_ref(index)?))
    }

    fn is_null_at(&self, index: usize) -> DbResult<bool> {
        if index >= self.columns.len() {
            return Err(DbError::FieldNotFound(format!("#{index}")));
        }
        Ok(matches!(self.row.get_ref(index)?, ValueRef::Null))
    }
}

/// Binds every entry of `params` to `stmt`.
///
/// A name resolves as written first, then with each placeholder sigil
/// (`@`, `:`, `$`) prefixed. When the statement declares no named
/// placeholders, entries bind at their insertion position instead.
/// Otherwise an entry that matches no placeholder is skipped, so it can
/// never overwrite a named parameter.
pub(crate) fn bind_parameters(stmt: &mut Statement<'_>, params: &Parameters) -> DbResult<()> {
    let positional = !has_named_placeholders(stmt);
    let mut skipped = 0;
    for (position, (name, value)) in params.iter().enumerate() {
        let index = match resolve_parameter_index(stmt, name)? {
            Some(index) => index,
            None if positional => position + 1,
            None => {
                skipped += 1;
                continue;
            }
        };
        stmt.raw_bind_parameter(index, Value::from(value))?;
    }
    if skipped > 0 {
        debug!(
            "event=db_bind module=db status=skipped unresolved_params={}",
            skipped
        );
    }
    Ok(())
}

fn has_named_placeholders(stmt: &Statement<'_>) -> bool {
    (1..=stmt.parameter_count()).any(|index| {
        stmt.parameter_name(index)
            .is_some_and(|name| !name.starts_with('?'))
    })
}

fn resolve_parameter_index(stmt: &Statement<'_>, name: &str) -> DbResult<Option<usize>> {
    if name.is_empty() {
        return Ok(None);
    }
    if let Some(index) = stmt.parameter_index(name)? {
        return Ok(Some(index));
    }
    if name.starts_with(PARAMETER_SIGILS) {
        return Ok(None);
    }
    for sigil in PARAMETER_SIGILS {
        if let Some(index) = stmt.parameter_index(&format!("{sigil}{name}"))? {
            return Ok(Some(index));
        }
    }
    Ok(None)
}
