//! Connection lifecycle: acquisition strategies, open-with-retry, release.
//!
//! # Responsibility
//! - Define the driver-facing `DriverConnection` and `Connector` contracts.
//! - Offer two acquisition strategies selected at construction:
//!   `SharedConnection` (one long-lived connection) and
//!   `PerCallConnection` (a fresh connection per call).
//! - Open with bounded retry and close on every exit path of a call.
//!
//! # Invariants
//! - `ensure_open` makes at most `1 + RetryPolicy::retries` attempts.
//! - `ensure_closed` is idempotent and never fails; per-call connections
//!   are also disposed.
//! - A `Session` closes its connection when dropped, whatever the outcome
//!   of the call that held it.
//!
//! # See also
//! - `db::database` for the statement executor built on `Session`.

use crate::db::params::Parameters;
use crate::db::record::Record;
use crate::db::value::SqlValue;
use crate::db::{DbError, DbResult};
use log::{debug, error, info, warn};
use std::cell::{RefCell, RefMut};
use std::ops::{Deref, DerefMut};
use std::thread;
use std::time::Duration;

const DEFAULT_OPEN_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// One connection reused by every call on the owning instance.
    Shared,
    /// A new connection per call, disposed when the call ends.
    PerCall,
}

impl ConnectionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shared => "shared",
            Self::PerCall => "per_call",
        }
    }
}

/// Bounded open retry: `retries` extra attempts with a fixed `delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// Total number of open attempts, first one included.
    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_OPEN_RETRIES, DEFAULT_RETRY_DELAY)
    }
}

/// A driver connection handle.
///
/// Statement methods are only called on an open connection. Every error
/// they return is the driver's own failure and is propagated unchanged.
pub trait DriverConnection {
    fn state(&self) -> ConnectionState;

    fn open(&mut self) -> DbResult<()>;

    /// Closes the connection. Closing a closed connection is a no-op.
    fn close(&mut self) -> DbResult<()>;

    /// Releases every resource held by the handle. A disposed connection
    /// refuses to open again.
    fn dispose(&mut self) -> DbResult<()>;

    /// Runs a statement and returns the affected row count.
    fn execute(&mut self, sql: &str, params: &Parameters) -> DbResult<usize>;

    /// First column of the first row, `None` when no row was produced.
    fn query_value(&mut self, sql: &str, params: &Parameters) -> DbResult<Option<SqlValue>>;

    /// Streams every result row through `visit`, stopping at the first error.
    fn for_each_row(
        &mut self,
        sql: &str,
        params: &Parameters,
        visit: &mut dyn FnMut(&dyn Record) -> DbResult<()>,
    ) -> DbResult<()>;

    /// Key generated by the last insert on this connection.
    fn last_insert_id(&self) -> DbResult<i64>;
}

/// Creates new, unopened connections from an opaque connection string.
pub trait Connector {
    type Connection: DriverConnection;

    fn connect(&self) -> Self::Connection;
}

/// How a manager obtains the connection for one call.
pub trait ConnectionStrategy {
    type Connection: DriverConnection;
    type Handle<'a>: DerefMut<Target = Self::Connection>
    where
        Self: 'a;

    fn mode(&self) -> ConnectionMode;

    /// Shared mode: the one connection. Per-call mode: a new, unopened one.
    fn current_connection(&self) -> DbResult<Self::Handle<'_>>;
}

/// Persistent mode. The wrapped connection lives as long as the strategy.
///
/// Not `Sync`: concurrent callers must serialize access themselves, for
/// example by keeping one instance per logical session.
pub struct SharedConnection<C: DriverConnection> {
    connection: RefCell<C>,
}

impl<C: DriverConnection> SharedConnection<C> {
    pub fn new(connection: C) -> Self {
        Self {
            connection: RefCell::new(connection),
        }
    }

    pub fn from_connector<K>(connector: &K) -> Self
    where
        K: Connector<Connection = C>,
    {
        Self::new(connector.connect())
    }
}

impl<C: DriverConnection> ConnectionStrategy for SharedConnection<C> {
    type Connection = C;
    type Handle<'a> = RefMut<'a, C> where Self: 'a;

    fn mode(&self) -> ConnectionMode {
        ConnectionMode::Shared
    }

    fn current_connection(&self) -> DbResult<RefMut<'_, C>> {
        // A second lease can only come from re-entrancy, e.g. a row mapper
        // calling back into the same database.
        self.connection
            .try_borrow_mut()
            .map_err(|_| DbError::ConnectionBusy)
    }
}

impl<C: DriverConnection> Drop for SharedConnection<C> {
    fn drop(&mut self) {
        if let Err(err) = self.connection.get_mut().dispose() {
            warn!(
                "event=db_dispose module=db status=error mode=shared error={}",
                err
            );
        }
    }
}

/// Ephemeral mode. Holds no connection; every call gets its own.
pub struct PerCallConnection<K: Connector> {
    connector: K,
}

impl<K: Connector> PerCallConnection<K> {
    pub fn new(connector: K) -> Self {
        Self { connector }
    }

    pub fn connector(&self) -> &K {
        &self.connector
    }
}

/// A connection owned by exactly one call.
pub struct OwnedConnection<C>(C);

impl<C> Deref for OwnedConnection<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.0
    }
}

impl<C> DerefMut for OwnedConnection<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.0
    }
}

impl<K: Connector> ConnectionStrategy for PerCallConnection<K> {
    type Connection = K::Connection;
    type Handle<'a> = OwnedConnection<K::Connection> where Self: 'a;

    fn mode(&self) -> ConnectionMode {
        ConnectionMode::PerCall
    }

    fn current_connection(&self) -> DbResult<OwnedConnection<K::Connection>> {
        Ok(OwnedConnection(self.connector.connect()))
    }
}

/// Owns a strategy plus the open retry policy.
pub struct ConnectionManager<S: ConnectionStrategy> {
    strategy: S,
    retry: RetryPolicy,
}

impl<S: ConnectionStrategy> ConnectionManager<S> {
    pub fn new(strategy: S, retry: RetryPolicy) -> Self {
        Self { strategy, retry }
    }

    pub fn mode(&self) -> ConnectionMode {
        self.strategy.mode()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn current_connection(&self) -> DbResult<S::Handle<'_>> {
        self.strategy.current_connection()
    }

    /// Opens `connection` unless it is already open.
    ///
    /// # Errors
    /// - `DbError::ConnectionFailure` once every attempt failed; `source`
    ///   is the last driver error.
    /// - `DbError::ConnectionDisposed` immediately, without retrying.
    pub fn ensure_open(&self, connection: &mut S::Connection) -> DbResult<()> {
        open_with_retry(connection, &self.retry, self.mode())
    }

    /// Best-effort release. Never fails and never panics.
    pub fn ensure_closed(&self, connection: &mut S::Connection) {
        release(connection, self.mode());
    }

    /// Leases the current connection and opens it.
    ///
    /// The returned session closes the connection when dropped. If opening
    /// fails the lease is released before the error is returned.
    pub fn acquire(&self) -> DbResult<Session<'_, S>> {
        let mode = self.mode();
        let handle = self.strategy.current_connection()?;
        let mut session = Session { handle, mode };
        open_with_retry::<S::Connection>(&mut *session, &self.retry, mode)?;
        debug!("event=db_acquire module=db status=ok mode={}", mode.as_str());
        Ok(session)
    }
}

/// An open connection scoped to one call.
pub struct Session<'a, S: ConnectionStrategy + 'a> {
    handle: S::Handle<'a>,
    mode: ConnectionMode,
}

impl<'a, S: ConnectionStrategy + 'a> Deref for Session<'a, S> {
    type Target = S::Connection;

    fn deref(&self) -> &S::Connection {
        &*self.handle
    }
}

impl<'a, S: ConnectionStrategy + 'a> DerefMut for Session<'a, S> {
    fn deref_mut(&mut self) -> &mut S::Connection {
        &mut *self.handle
    }
}

impl<'a, S: ConnectionStrategy + 'a> Drop for Session<'a, S> {
    fn drop(&mut self) {
        release(&mut *self.handle, self.mode);
    }
}

fn open_with_retry<C>(connection: &mut C, policy: &RetryPolicy, mode: ConnectionMode) -> DbResult<()>
where
    C: DriverConnection + ?Sized,
{
    if connection.state() == ConnectionState::Open {
        return Ok(());
    }

    let attempts = policy.attempts();
    let mut attempt = 0;
    loop {
        attempt += 1;
        match connection.open() {
            Ok(()) => {
                if attempt > 1 {
                    info!(
                        "event=db_open module=db status=recovered mode={} attempt={}",
                        mode.as_str(),
                        attempt
                    );
                }
                return Ok(());
            }
            Err(DbError::ConnectionDisposed) => return Err(DbError::ConnectionDisposed),
            Err(err) if attempt < attempts => {
                warn!(
                    "event=db_open module=db status=retry mode={} attempt={} max_attempts={} error={}",
                    mode.as_str(),
                    attempt,
                    attempts,
                    err
                );
                thread::sleep(policy.delay);
            }
            Err(err) => {
                error!(
                    "event=db_open module=db status=error mode={} attempts={} error_code=db_open_exhausted error={}",
                    mode.as_str(),
                    attempt,
                    err
                );
                return Err(DbError::ConnectionFailure {
                    attempts: attempt,
                    source: Box::new(err),
                });
            }
        }
    }
}

fn release<C>(connection: &mut C, mode: ConnectionMode)
where
    C: DriverConnection + ?Sized,
{
    if connection.state() == ConnectionState::Open {
        if let Err(err) = connection.close() {
            warn!(
                "event=db_close module=db status=error mode={} error={}",
                mode.as_str(),
                err
            );
        }
    }

    if mode == ConnectionMode::PerCall {
        if let Err(err) = connection.dispose() {
            warn!(
                "event=db_dispose module=db status=error mode={} error={}",
                mode.as_str(),
                err
            );
        }
    }
}
