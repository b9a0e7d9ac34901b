//! Identity tables on top of the data-access core.
//!
//! # Responsibility
//! - Issue one hand-written parameterized statement per table operation.
//! - Map rows to identity models by column name, never by position.
//!
//! # Invariants
//! - Tables borrow a `Database` and never hold a connection themselves.
//! - Mutations return the driver's affected-row count unchanged.

pub mod role_table;
pub mod user_claims_table;
pub mod user_logins_table;
pub mod user_roles_table;
pub mod user_table;

use crate::db::{DbResult, FromField, SqlValue};

/// Reads an optional scalar key returned by `Database::query_value`.
pub(crate) fn scalar_key(column: &str, value: Option<SqlValue>) -> DbResult<Option<i64>> {
    match value {
        Some(value) => Option::<i64>::from_field(column, value),
        None => Ok(None),
    }
}
