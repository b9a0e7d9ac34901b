//! Role model.

use serde::{Deserialize, Serialize};

/// Store-assigned role key.
pub type RoleId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// `0` until inserted.
    pub id: RoleId,
    pub name: String,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(0, name)
    }

    pub fn with_id(id: RoleId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}
