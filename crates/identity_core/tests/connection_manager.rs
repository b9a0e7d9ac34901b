use identity_core::db::{
    ConnectionManager, ConnectionMode, ConnectionState, ConnectionStrategy, Connector, Database,
    DbError, DbResult, DriverConnection, OwnedRecord, Parameters, PerCallConnection, Record,
    RetryPolicy, SharedConnection, SqlValue,
};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

#[derive(Default)]
struct Journal {
    created: usize,
    open_attempts: u32,
    events: Vec<String>,
}

#[derive(Clone, Default)]
struct Script {
    failing_opens: u32,
    failing_close: bool,
    failing_dispose: bool,
    rows: Vec<OwnedRecord>,
}

#[derive(Clone)]
struct ScriptedConnector {
    script: Rc<Script>,
    journal: Rc<RefCell<Journal>>,
}

impl ScriptedConnector {
    fn new(script: Script) -> Self {
        Self {
            script: Rc::new(script),
            journal: Rc::new(RefCell::new(Journal::default())),
        }
    }

    fn created(&self) -> usize {
        self.journal.borrow().created
    }

    fn open_attempts(&self) -> u32 {
        self.journal.borrow().open_attempts
    }

    fn events(&self) -> Vec<String> {
        self.journal.borrow().events.clone()
    }
}

impl Connector for ScriptedConnector {
    type Connection = ScriptedConnection;

    fn connect(&self) -> ScriptedConnection {
        let mut journal = self.journal.borrow_mut();
        journal.created += 1;
        ScriptedConnection {
            id: journal.created,
            state: ConnectionState::Closed,
            disposed: false,
            script: Rc::clone(&self.script),
            journal: Rc::clone(&self.journal),
        }
    }
}

struct ScriptedConnection {
    id: usize,
    state: ConnectionState,
    disposed: bool,
    script: Rc<Script>,
    journal: Rc<RefCell<Journal>>,
}

impl ScriptedConnection {
    fn record(&self, event: &str) {
        self.journal
            .borrow_mut()
            .events
            .push(format!("{event}:{}", self.id));
    }
}

fn driver_error() -> DbError {
    DbError::Sqlite(rusqlite::Error::InvalidPath(PathBuf::from("unreachable.db")))
}

impl DriverConnection for ScriptedConnection {
    fn state(&self) -> ConnectionState {
        self.state
    }

    fn open(&mut self) -> DbResult<()> {
        if self.disposed {
            return Err(DbError::ConnectionDisposed);
        }
        let attempt = {
            let mut journal = self.journal.borrow_mut();
            journal.open_attempts += 1;
            journal.open_attempts
        };
        if attempt <= self.script.failing_opens {
            self.record("open_failed");
            return Err(driver_error());
        }
        self.record("open");
        self.state = ConnectionState::Open;
        Ok(())
    }

    fn close(&mut self) -> DbResult<()> {
        self.record("close");
        self.state = ConnectionState::Closed;
        if self.script.failing_close {
            return Err(driver_error());
        }
        Ok(())
    }

    fn dispose(&mut self) -> DbResult<()> {
        self.record("dispose");
        self.disposed = true;
        if self.script.failing_dispose {
            return Err(driver_error());
        }
        Ok(())
    }

    fn execute(&mut self, _sql: &str, _params: &Parameters) -> DbResult<usize> {
        self.record("execute");
        Ok(1)
    }

    fn query_value(&mut self, _sql: &str, _params: &Parameters) -> DbResult<Option<SqlValue>> {
        self.record("query_value");
        Ok(Some(SqlValue::Integer(7)))
    }

    fn for_each_row(
        &mut self,
        _sql: &str,
        _params: &Parameters,
        visit: &mut dyn FnMut(&dyn Record) -> DbResult<()>,
    ) -> DbResult<()> {
        self.record("query");
        for row in &self.script.rows {
            visit(row)?;
        }
        Ok(())
    }

    fn last_insert_id(&self) -> DbResult<i64> {
        Ok(42)
    }
}

fn no_delay(retries: u32) -> RetryPolicy {
    RetryPolicy::new(retries, Duration::ZERO)
}

fn per_call(connector: &ScriptedConnector) -> Database<PerCallConnection<ScriptedConnector>> {
    Database::new(PerCallConnection::new(connector.clone()), no_delay(3))
}

fn shared(connector: &ScriptedConnector) -> Database<SharedConnection<ScriptedConnection>> {
    Database::new(SharedConnection::from_connector(connector), no_delay(3))
}

#[test]
fn per_call_mode_uses_a_fresh_connection_and_disposes_it() {
    let connector = ScriptedConnector::new(Script::default());
    let db = per_call(&connector);
    assert_eq!(db.mode(), ConnectionMode::PerCall);
    assert_eq!(connector.created(), 0);

    assert_eq!(db.execute("UPDATE t SET x = 1", &Parameters::new()).unwrap(), 1);
    assert_eq!(db.insert("INSERT INTO t DEFAULT VALUES", &Parameters::new()).unwrap(), 42);

    assert_eq!(connector.created(), 2);
    assert_eq!(
        connector.events(),
        vec![
            "open:1", "execute:1", "close:1", "dispose:1", "open:2", "execute:2", "close:2",
            "dispose:2",
        ]
    );
}

#[test]
fn shared_mode_reuses_one_connection_and_closes_it_after_each_call() {
    let connector = ScriptedConnector::new(Script::default());
    let db = shared(&connector);
    assert_eq!(db.mode(), ConnectionMode::Shared);

    db.execute("UPDATE t SET x = 1", &Parameters::new()).unwrap();
    let value = db.query_value("SELECT x FROM t", &Parameters::new()).unwrap();
    assert_eq!(value, Some(SqlValue::Integer(7)));

    assert_eq!(connector.created(), 1);
    assert_eq!(
        connector.events(),
        vec!["open:1", "execute:1", "close:1", "open:1", "query_value:1", "close:1"]
    );
    assert_eq!(
        db.manager().current_connection().unwrap().state(),
        ConnectionState::Closed
    );

    drop(db);
    assert_eq!(connector.events().last().map(String::as_str), Some("dispose:1"));
}

#[test]
fn open_recovers_after_a_transient_failure() {
    let connector = ScriptedConnector::new(Script {
        failing_opens: 1,
        ..Script::default()
    });
    let db = per_call(&connector);

    assert_eq!(db.execute("UPDATE t SET x = 1", &Parameters::new()).unwrap(), 1);
    assert_eq!(connector.open_attempts(), 2);
}

#[test]
fn open_gives_up_after_one_attempt_plus_three_retries() {
    let connector = ScriptedConnector::new(Script {
        failing_opens: u32::MAX,
        ..Script::default()
    });
    let db = per_call(&connector);

    let err = db
        .execute("UPDATE t SET x = 1", &Parameters::new())
        .unwrap_err();
    match err {
        DbError::ConnectionFailure { attempts, source } => {
            assert_eq!(attempts, 4);
            assert!(matches!(*source, DbError::Sqlite(_)));
        }
        other => panic!("expected ConnectionFailure, got {other:?}"),
    }
    assert_eq!(connector.open_attempts(), 4);

    let events = connector.events();
    assert!(!events.iter().any(|event| event.starts_with("execute")));
    assert_eq!(events.last().map(String::as_str), Some("dispose:1"));
}

#[test]
fn zero_retries_makes_exactly_one_attempt() {
    let connector = ScriptedConnector::new(Script {
        failing_opens: u32::MAX,
        ..Script::default()
    });
    let db = Database::new(PerCallConnection::new(connector.clone()), no_delay(0));

    let err = db.query_value("SELECT 1", &Parameters::new()).unwrap_err();
    assert!(matches!(err, DbError::ConnectionFailure { attempts: 1, .. }));
    assert_eq!(connector.open_attempts(), 1);
}

#[test]
fn empty_command_text_fails_before_any_connection_exists() {
    let connector = ScriptedConnector::new(Script::default());
    let db = per_call(&connector);

    assert!(matches!(
        db.execute("", &Parameters::new()),
        Err(DbError::InvalidArgument(_))
    ));
    assert!(matches!(
        db.query("   \n", &Parameters::new(), |_| Ok(())),
        Err(DbError::InvalidArgument(_))
    ));
    assert!(matches!(
        db.insert("\t", &Parameters::new()),
        Err(DbError::InvalidArgument(_))
    ));
    assert_eq!(connector.created(), 0);
    assert!(connector.events().is_empty());
}

#[test]
fn reentrant_call_on_shared_connection_is_busy() {
    let connector = ScriptedConnector::new(Script {
        rows: vec![OwnedRecord::new().with("Id", 1_i64)],
        ..Script::default()
    });
    let db = shared(&connector);

    let err = db
        .query("SELECT Id FROM t", &Parameters::new(), |_row| {
            db.execute("UPDATE t SET x = 1", &Parameters::new())
        })
        .unwrap_err();
    assert!(matches!(err, DbError::ConnectionBusy));

    // The failed call still released the lease.
    assert_eq!(db.execute("UPDATE t SET x = 1", &Parameters::new()).unwrap(), 1);
}

#[test]
fn cleanup_failures_never_surface() {
    let connector = ScriptedConnector::new(Script {
        failing_close: true,
        failing_dispose: true,
        ..Script::default()
    });
    let db = per_call(&connector);

    assert_eq!(db.execute("UPDATE t SET x = 1", &Parameters::new()).unwrap(), 1);
    assert_eq!(
        connector.events(),
        vec!["open:1", "execute:1", "close:1", "dispose:1"]
    );
}

#[test]
fn disposed_connection_fails_fast_and_close_is_idempotent() {
    let connector = ScriptedConnector::new(Script::default());
    let manager = ConnectionManager::new(PerCallConnection::new(connector.clone()), no_delay(3));

    let mut conn = manager.current_connection().unwrap();
    manager.ensure_open(&mut conn).unwrap();
    manager.ensure_closed(&mut conn);
    manager.ensure_closed(&mut conn);
    assert_eq!(conn.state(), ConnectionState::Closed);

    assert!(matches!(
        manager.ensure_open(&mut conn),
        Err(DbError::ConnectionDisposed)
    ));
    assert_eq!(connector.open_attempts(), 1);
}

#[test]
fn shared_strategy_hands_out_the_same_connection() {
    let connector = ScriptedConnector::new(Script::default());
    let strategy = SharedConnection::from_connector(&connector);

    let first_id = strategy.current_connection().unwrap().id;
    let second_id = strategy.current_connection().unwrap().id;
    assert_eq!(first_id, second_id);
    assert_eq!(connector.created(), 1);
}
