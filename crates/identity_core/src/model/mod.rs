//! Identity entities persisted by the table layer.
//!
//! # Responsibility
//! - Define users, roles, claims and external logins as plain records.
//!
//! # Invariants
//! - Store-assigned keys are `0` until the row has been inserted.
//! - Timestamps are Unix epoch milliseconds.

pub mod claim;
pub mod login;
pub mod role;
pub mod user;
