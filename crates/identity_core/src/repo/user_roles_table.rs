//! `userroles` link table access.

use crate::db::{ConnectionStrategy, Database, DbResult, Parameters, RecordExt};
use crate::model::role::RoleId;
use crate::model::user::UserId;

pub struct UserRolesTable<'db, S: ConnectionStrategy> {
    db: &'db Database<S>,
}

impl<'db, S: ConnectionStrategy> UserRolesTable<'db, S> {
    pub fn new(db: &'db Database<S>) -> Self {
        Self { db }
    }

    /// Names of the roles linked to `user_id`, sorted by name.
    pub fn find_by_user_id(&self, user_id: UserId) -> DbResult<Vec<String>> {
        self.db.query(
            "SELECT r.Name AS Name
             FROM userroles AS ur
             INNER JOIN roles AS r ON r.Id = ur.RoleId
             WHERE ur.UserId = @userId
             ORDER BY r.Name",
            &Parameters::new().with("@userId", user_id),
            |row| row.get_string("Name"),
        )
    }

    /// Removes every role link of `user_id`.
    pub fn delete(&self, user_id: UserId) -> DbResult<usize> {
        self.db.execute(
            "DELETE FROM userroles WHERE UserId = @userId",
            &Parameters::new().with("@userId", user_id),
        )
    }

    pub fn insert(&self, user_id: UserId, role_id: RoleId) -> DbResult<usize> {
        self.db.execute(
            "INSERT INTO userroles (UserId, RoleId) VALUES (@userId, @roleId)",
            &Parameters::new()
                .with("@userId", user_id)
                .with("@roleId", role_id),
        )
    }
}
