//! `userlogins` table access.
//!
//! A login is unique per `(LoginProvider, ProviderKey)`; lookups by login
//! therefore resolve to at most one user.

use crate::db::{ConnectionStrategy, Database, DbResult, Parameters, Record, RecordExt};
use crate::model::login::UserLoginInfo;
use crate::model::user::UserId;
use crate::repo::scalar_key;

pub struct UserLoginsTable<'db, S: ConnectionStrategy> {
    db: &'db Database<S>,
}

impl<'db, S: ConnectionStrategy> UserLoginsTable<'db, S> {
    pub fn new(db: &'db Database<S>) -> Self {
        Self { db }
    }

    pub fn insert(&self, user_id: UserId, login: &UserLoginInfo) -> DbResult<usize> {
        self.db.execute(
            "INSERT INTO userlogins (LoginProvider, ProviderKey, UserId)
             VALUES (@provider, @key, @userId)",
            &login_params(login).with("@userId", user_id),
        )
    }

    pub fn delete(&self, user_id: UserId, login: &UserLoginInfo) -> DbResult<usize> {
        self.db.execute(
            "DELETE FROM userlogins
             WHERE UserId = @userId AND LoginProvider = @provider AND ProviderKey = @key",
            &login_params(login).with("@userId", user_id),
        )
    }

    pub fn delete_all(&self, user_id: UserId) -> DbResult<usize> {
        self.db.execute(
            "DELETE FROM userlogins WHERE UserId = @userId",
            &Parameters::new().with("@userId", user_id),
        )
    }

    pub fn find_user_id_by_login(&self, login: &UserLoginInfo) -> DbResult<Option<UserId>> {
        let value = self.db.query_value(
            "SELECT UserId FROM userlogins WHERE LoginProvider = @provider AND ProviderKey = @key",
            &login_params(login),
        )?;
        scalar_key("UserId", value)
    }

    pub fn find_by_user_id(&self, user_id: UserId) -> DbResult<Vec<UserLoginInfo>> {
        self.db.query(
            "SELECT LoginProvider, ProviderKey FROM userlogins
             WHERE UserId = @userId
             ORDER BY LoginProvider, ProviderKey",
            &Parameters::new().with("@userId", user_id),
            read_login,
        )
    }
}

fn login_params(login: &UserLoginInfo) -> Parameters {
    Parameters::new()
        .with("@provider", login.login_provider.as_str())
        .with("@key", login.provider_key.as_str())
}

fn read_login(row: &dyn Record) -> DbResult<UserLoginInfo> {
    Ok(UserLoginInfo::new(
        row.get_string("LoginProvider")?,
        row.get_string("ProviderKey")?,
    ))
}
