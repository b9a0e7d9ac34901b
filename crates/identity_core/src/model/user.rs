//! User account model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Store-assigned user key.
pub type UserId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// `0` until inserted.
    pub id: UserId,
    pub user_name: String,
    pub email: Option<String>,
    pub email_confirmed: bool,
    pub password_hash: Option<String>,
    /// Rotated whenever credentials change.
    pub security_stamp: Option<String>,
    pub phone_number: Option<String>,
    pub phone_number_confirmed: bool,
    pub two_factor_enabled: bool,
    /// Unix epoch milliseconds, UTC.
    pub lockout_end_date_utc: Option<i64>,
    pub lockout_enabled: bool,
    pub access_failed_count: i32,
}

impl User {
    /// Creates an unsaved user with a fresh security stamp.
    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            id: 0,
            user_name: user_name.into(),
            email: None,
            email_confirmed: false,
            password_hash: None,
            security_stamp: Some(Uuid::new_v4().to_string()),
            phone_number: None,
            phone_number_confirmed: false,
            two_factor_enabled: false,
            lockout_end_date_utc: None,
            lockout_enabled: false,
            access_failed_count: 0,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }

    /// Replaces the security stamp, invalidating issued tokens.
    pub fn rotate_security_stamp(&mut self) {
        self.security_stamp = Some(Uuid::new_v4().to_string());
    }
}
