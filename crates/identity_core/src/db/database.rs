//! Statement executor.
//!
//! # Responsibility
//! - Run non-query, scalar, mapped multi-row and insert-with-key statements
//!   on a connection leased from `ConnectionManager`.
//! - Keep the connection scoped to one call.
//!
//! # Invariants
//! - Empty command text fails with `DbError::InvalidArgument` before any
//!   connection is created.
//! - Only opening retries; a failed statement is never re-run.
//! - Multi-row results are complete or absent, never partial.

use crate::db::connection::{
    ConnectionManager, ConnectionMode, ConnectionStrategy, DriverConnection, PerCallConnection,
    RetryPolicy, SharedConnection,
};
use crate::db::params::Parameters;
use crate::db::record::Record;
use crate::db::sqlite::{SqliteConnection, SqliteConnector};
use crate::db::value::SqlValue;
use crate::db::{DbError, DbResult};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything needed to reach one SQLite database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    /// Opaque to the core: a file path or a `file:` URI.
    pub connection_string: String,
    pub retry: RetryPolicy,
    pub busy_timeout: Duration,
}

impl DatabaseSettings {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            retry: RetryPolicy::default(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn connector(&self) -> SqliteConnector {
        SqliteConnector::new(self.connection_string.clone()).with_busy_timeout(self.busy_timeout)
    }
}

/// One long-lived SQLite connection. Not safe to share across threads.
pub type SharedDatabase = Database<SharedConnection<SqliteConnection>>;

/// A fresh SQLite connection per call. Safe for concurrent callers.
pub type PerCallDatabase = Database<PerCallConnection<SqliteConnector>>;

/// Executor facade over a connection strategy.
pub struct Database<S: ConnectionStrategy> {
    manager: ConnectionManager<S>,
}

impl Database<SharedConnection<SqliteConnection>> {
    pub fn shared(settings: &DatabaseSettings) -> Self {
        let strategy = SharedConnection::from_connector(&settings.connector());
        Self::new(strategy, settings.retry)
    }
}

impl Database<PerCallConnection<SqliteConnector>> {
    pub fn per_call(settings: &DatabaseSettings) -> Self {
        Self::new(PerCallConnection::new(settings.connector()), settings.retry)
    }
}

impl<S: ConnectionStrategy> Database<S> {
    pub fn new(strategy: S, retry: RetryPolicy) -> Self {
        Self {
            manager: ConnectionManager::new(strategy, retry),
        }
    }

    pub fn manager(&self) -> &ConnectionManager<S> {
        &self.manager
    }

    pub fn mode(&self) -> ConnectionMode {
        self.manager.mode()
    }

    /// Runs a mutation and returns the number of affected rows.
    pub fn execute(&self, sql: &str, params: &Parameters) -> DbResult<usize> {
        self.run("execute", sql, |conn| conn.execute(sql, params))
    }

    /// Runs a statement expected to yield one value.
    ///
    /// Returns `None` for an empty result set and `Some(SqlValue::Null)` when
    /// the first column of the first row is NULL.
    pub fn query_value(&self, sql: &str, params: &Parameters) -> DbResult<Option<SqlValue>> {
        self.run("query_value", sql, |conn| conn.query_value(sql, params))
    }

    /// Maps every result row through `mapper`, preserving result order.
    ///
    /// The row passed to `mapper` is only valid for that invocation. The
    /// result stream is drained before this returns; the first mapper or
    /// driver error discards everything mapped so far.
    pub fn query<T, F>(&self, sql: &str, params: &Parameters, mut mapper: F) -> DbResult<Vec<T>>
    where
        F: FnMut(&dyn Record) -> DbResult<T>,
    {
        self.run("query", sql, |conn| {
            let mut records = Vec::new();
            conn.for_each_row(sql, params, &mut |row: &dyn Record| {
                records.push(mapper(row)?);
                Ok(())
            })?;
            Ok(records)
        })
    }

    /// Untyped multi-row query: each row becomes column name → text.
    pub fn query_rows(
        &self,
        sql: &str,
        params: &Parameters,
    ) -> DbResult<Vec<BTreeMap<String, Option<String>>>> {
        self.query(sql, params, |row| {
            let mut columns = BTreeMap::new();
            for index in 0..row.column_count() {
                let name = row.column_name(index).unwrap_or_default().to_string();
                columns.insert(name, row.value_at(index)?.to_text());
            }
            Ok(columns)
        })
    }

    /// Runs an insert and returns the key it generated.
    ///
    /// The key is read on the same connection right after the insert.
    pub fn insert(&self, sql: &str, params: &Parameters) -> DbResult<i64> {
        self.run("insert", sql, |conn| {
            conn.execute(sql, params)?;
            conn.last_insert_id()
        })
    }

    /// Scalar as text. Absent and NULL both give `None`.
    pub fn get_str_value(&self, sql: &str, params: &Parameters) -> DbResult<Option<String>> {
        Ok(self
            .query_value(sql, params)?
            .and_then(|value| value.to_text()))
    }

    /// Scalar as `u32`. Absent and NULL both give `0`.
    ///
    /// Deliberately differs from [`Database::get_str_value`], which reports
    /// absence as `None`; callers rely on both conventions. Reals round to
    /// the nearest integer, ties to even. Negative, out-of-range and
    /// non-numeric values are `DbError::TypeMismatch`.
    pub fn get_u32_value(&self, sql: &str, params: &Parameters) -> DbResult<u32> {
        match self.query_value(sql, params)? {
            None | Some(SqlValue::Null) => Ok(0),
            Some(SqlValue::Integer(raw)) => u32::try_from(raw).map_err(|_| {
                DbError::type_mismatch("<scalar>", "u32", format!("out-of-range integer {raw}"))
            }),
            Some(SqlValue::Real(raw)) => real_to_u32(raw),
            Some(SqlValue::Text(text)) => text
                .trim()
                .parse::<u32>()
                .map_err(|_| DbError::type_mismatch("<scalar>", "u32", format!("text `{text}`"))),
            Some(other) => Err(DbError::type_mismatch("<scalar>", "u32", other.kind())),
        }
    }

    fn run<T>(
        &self,
        operation: &'static str,
        sql: &str,
        body: impl FnOnce(&mut S::Connection) -> DbResult<T>,
    ) -> DbResult<T> {
        ensure_command_text(operation, sql)?;

        let started_at = Instant::now();
        // The session is dropped, and its connection closed, before logging.
        let result = self
            .manager
            .acquire()
            .and_then(|mut session| body(&mut *session));

        match &result {
            Ok(_) => debug!(
                "event=db_{} module=db status=ok mode={} duration_ms={}",
                operation,
                self.mode().as_str(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=db_{} module=db status=error mode={} duration_ms={} error={}",
                operation,
                self.mode().as_str(),
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }
}

fn real_to_u32(raw: f64) -> DbResult<u32> {
    let rounded = raw.round_ties_even();
    if rounded.is_finite() && (0.0..=f64::from(u32::MAX)).contains(&rounded) {
        Ok(rounded as u32)
    } else {
        Err(DbError::type_mismatch(
            "<scalar>",
            "u32",
            format!("out-of-range real {raw}"),
        ))
    }
}

fn ensure_command_text(operation: &'static str, sql: &str) -> DbResult<()> {
    if sql.trim().is_empty() {
        warn!(
            "event=db_{} module=db status=error error_code=empty_command",
            operation
        );
        return Err(DbError::InvalidArgument(
            "command text cannot be empty".to_string(),
        ));
    }
    Ok(())
}
