//! Relational data-access core.
//!
//! # Responsibility
//! - Own connection lifecycle (open with bounded retry, guaranteed close).
//! - Execute parameterized statements in four shapes: non-query, scalar,
//!   mapped multi-row and insert-with-generated-key.
//! - Expose nullable-safe, name-based typed field access on result rows.
//!
//! # Invariants
//! - A connection opened by a call is closed before that call returns.
//! - Empty command text is rejected before any connection is created.
//! - Driver failures propagate unchanged; cleanup failures never surface.
//!
//! # See also
//! - `db::connection` for the shared/per-call strategies.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod connection;
pub mod database;
pub mod params;
pub mod record;
pub mod sqlite;
pub mod value;

pub use connection::{
    ConnectionManager, ConnectionMode, ConnectionState, ConnectionStrategy, Connector,
    DriverConnection, OwnedConnection, PerCallConnection, RetryPolicy, Session, SharedConnection,
};
pub use database::{Database, DatabaseSettings, PerCallDatabase, SharedDatabase};
pub use params::Parameters;
pub use record::{FromField, OwnedRecord, Record, RecordExt};
pub use sqlite::{SqliteConnection, SqliteConnector};
pub use value::SqlValue;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// Command text was empty; raised before touching the backend.
    InvalidArgument(String),
    /// Every open attempt failed. `source` is the last driver failure.
    ConnectionFailure {
        attempts: u32,
        source: Box<DbError>,
    },
    /// The shared connection is already leased by an in-flight call.
    ConnectionBusy,
    /// The connection was disposed and cannot be reopened.
    ConnectionDisposed,
    FieldNotFound(String),
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: String,
    },
    /// Statement rejected or failed inside the driver.
    Sqlite(rusqlite::Error),
    /// A row mapper rejected a persisted value.
    InvalidData(String),
}

impl DbError {
    pub(crate) fn type_mismatch(
        column: impl Into<String>,
        expected: &'static str,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            column: column.into(),
            expected,
            found: found.into(),
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::ConnectionFailure { attempts, source } => {
                write!(f, "failed to open connection after {attempts} attempts: {source}")
            }
            Self::ConnectionBusy => write!(f, "shared connection is already in use"),
            Self::ConnectionDisposed => write!(f, "connection has been disposed"),
            Self::FieldNotFound(column) => write!(f, "column `{column}` not found in row"),
            Self::TypeMismatch {
                column,
                expected,
                found,
            } => write!(
                f,
                "column `{column}` holds {found}, which cannot be read as {expected}"
            ),
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ConnectionFailure { source, .. } => Some(source.as_ref()),
            Self::Sqlite(err) => Some(err),
            Self::InvalidArgument(_)
            | Self::ConnectionBusy
            | Self::ConnectionDisposed
            | Self::FieldNotFound(_)
            | Self::TypeMismatch { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
