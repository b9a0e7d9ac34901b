//! `userclaims` table access.

use crate::db::{ConnectionStrategy, Database, DbResult, Parameters, Record, RecordExt};
use crate::model::claim::Claim;
use crate::model::user::UserId;

pub struct UserClaimsTable<'db, S: ConnectionStrategy> {
    db: &'db Database<S>,
}

impl<'db, S: ConnectionStrategy> UserClaimsTable<'db, S> {
    pub fn new(db: &'db Database<S>) -> Self {
        Self { db }
    }

    pub fn find_by_user_id(&self, user_id: UserId) -> DbResult<Vec<Claim>> {
        self.db.query(
            "SELECT ClaimType, ClaimValue FROM userclaims WHERE UserId = @userId ORDER BY Id",
            &Parameters::new().with("@userId", user_id),
            read_claim,
        )
    }

    pub fn insert(&self, claim: &Claim, user_id: UserId) -> DbResult<usize> {
        self.db.execute(
            "INSERT INTO userclaims (ClaimValue, ClaimType, UserId) VALUES (@value, @type, @userId)",
            &Parameters::new()
                .with("@value", claim.value.as_str())
                .with("@type", claim.claim_type.as_str())
                .with("@userId", user_id),
        )
    }

    /// Removes one claim of `user_id`, matched on type and value.
    pub fn delete(&self, user_id: UserId, claim: &Claim) -> DbResult<usize> {
        self.db.execute(
            "DELETE FROM userclaims
             WHERE UserId = @userId AND ClaimValue = @value AND ClaimType = @type",
            &Parameters::new()
                .with("@userId", user_id)
                .with("@value", claim.value.as_str())
                .with("@type", claim.claim_type.as_str()),
        )
    }

    pub fn delete_all(&self, user_id: UserId) -> DbResult<usize> {
        self.db.execute(
            "DELETE FROM userclaims WHERE UserId = @userId",
            &Parameters::new().with("@userId", user_id),
        )
    }
}

fn read_claim(row: &dyn Record) -> DbResult<Claim> {
    Ok(Claim::new(
        row.get_string("ClaimType")?,
        row.get_string("ClaimValue")?,
    ))
}
