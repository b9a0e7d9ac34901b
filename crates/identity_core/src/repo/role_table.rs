//! `roles` table access.

use crate::db::{ConnectionStrategy, Database, DbResult, Parameters};
use crate::model::role::{Role, RoleId};
use crate::repo::scalar_key;

pub struct RoleTable<'db, S: ConnectionStrategy> {
    db: &'db Database<S>,
}

impl<'db, S: ConnectionStrategy> RoleTable<'db, S> {
    pub fn new(db: &'db Database<S>) -> Self {
        Self { db }
    }

    pub fn delete(&self, role_id: RoleId) -> DbResult<usize> {
        self.db.execute(
            "DELETE FROM roles WHERE Id = @id",
            &Parameters::new().with("@id", role_id),
        )
    }

    /// Inserts `role` and stores the generated key in `role.id`.
    pub fn insert(&self, role: &mut Role) -> DbResult<RoleId> {
        let id = self.db.insert(
            "INSERT INTO roles (Name) VALUES (@name)",
            &Parameters::new().with("@name", role.name.as_str()),
        )?;
        role.id = id;
        Ok(id)
    }

    pub fn get_role_name(&self, role_id: RoleId) -> DbResult<Option<String>> {
        self.db.get_str_value(
            "SELECT Name FROM roles WHERE Id = @id",
            &Parameters::new().with("@id", role_id),
        )
    }

    pub fn get_role_id(&self, role_name: &str) -> DbResult<Option<RoleId>> {
        let value = self.db.query_value(
            "SELECT Id FROM roles WHERE Name = @name",
            &Parameters::new().with("@name", role_name),
        )?;
        scalar_key("Id", value)
    }

    pub fn get_role_by_id(&self, role_id: RoleId) -> DbResult<Option<Role>> {
        Ok(self
            .get_role_name(role_id)?
            .map(|name| Role::with_id(role_id, name)))
    }

    pub fn get_role_by_name(&self, role_name: &str) -> DbResult<Option<Role>> {
        Ok(self
            .get_role_id(role_name)?
            .map(|id| Role::with_id(id, role_name)))
    }

    pub fn update(&self, role: &Role) -> DbResult<usize> {
        self.db.execute(
            "UPDATE roles SET Name = @name WHERE Id = @id",
            &Parameters::new()
                .with("@name", role.name.as_str())
                .with("@id", role.id),
        )
    }
}
