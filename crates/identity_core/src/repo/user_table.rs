//! `users` table access.
//!
//! # Invariants
//! - `insert` writes the generated key back into the model.
//! - An empty stored password hash reads as "no password".

use crate::db::{ConnectionStrategy, Database, DbResult, Parameters, Record, RecordExt};
use crate::model::user::{User, UserId};
use crate::repo::scalar_key;

const USER_COLUMNS: &str = "Id, UserName, Email, EmailConfirmed, PasswordHash, SecurityStamp,
    PhoneNumber, PhoneNumberConfirmed, TwoFactorEnabled, LockoutEndDateUtc, LockoutEnabled,
    AccessFailedCount";

pub struct UserTable<'db, S: ConnectionStrategy> {
    db: &'db Database<S>,
}

impl<'db, S: ConnectionStrategy> UserTable<'db, S> {
    pub fn new(db: &'db Database<S>) -> Self {
        Self { db }
    }

    /// Loads every user. Intended for small administrative listings.
    pub fn get_users(&self) -> DbResult<Vec<User>> {
        self.db.query(
            &format!("SELECT {USER_COLUMNS} FROM users ORDER BY Id"),
            &Parameters::new(),
            read_user,
        )
    }

    pub fn get_user_name(&self, user_id: UserId) -> DbResult<Option<String>> {
        self.db.get_str_value(
            "SELECT UserName FROM users WHERE Id = @id",
            &Parameters::new().with("@id", user_id),
        )
    }

    pub fn get_user_id(&self, user_name: &str) -> DbResult<Option<UserId>> {
        let value = self.db.query_value(
            "SELECT Id FROM users WHERE UserName = @name",
            &Parameters::new().with("@name", user_name),
        )?;
        scalar_key("Id", value)
    }

    pub fn get_user_by_id(&self, user_id: UserId) -> DbResult<Option<User>> {
        let users = self.db.query(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE Id = @id"),
            &Parameters::new().with("@id", user_id),
            read_user,
        )?;
        Ok(users.into_iter().next())
    }

    pub fn get_user_by_name(&self, user_name: &str) -> DbResult<Vec<User>> {
        self.db.query(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE UserName = @name ORDER BY Id"),
            &Parameters::new().with("@name", user_name),
            read_user,
        )
    }

    pub fn get_user_by_email(&self, email: &str) -> DbResult<Vec<User>> {
        self.db.query(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE Email = @email ORDER BY Id"),
            &Parameters::new().with("@email", email),
            read_user,
        )
    }

    pub fn get_password_hash(&self, user_id: UserId) -> DbResult<Option<String>> {
        let hash = self.db.get_str_value(
            "SELECT PasswordHash FROM users WHERE Id = @id",
            &Parameters::new().with("@id", user_id),
        )?;
        Ok(hash.filter(|hash| !hash.is_empty()))
    }

    pub fn set_password_hash(
        &self,
        user_id: UserId,
        password_hash: Option<&str>,
    ) -> DbResult<usize> {
        self.db.execute(
            "UPDATE users SET PasswordHash = @pwdHash WHERE Id = @id",
            &Parameters::new()
                .with("@pwdHash", password_hash)
                .with("@id", user_id),
        )
    }

    pub fn get_security_stamp(&self, user_id: UserId) -> DbResult<Option<String>> {
        self.db.get_str_value(
            "SELECT SecurityStamp FROM users WHERE Id = @id",
            &Parameters::new().with("@id", user_id),
        )
    }

    pub fn insert(&self, user: &mut User) -> DbResult<UserId> {
        let id = self.db.insert(
            "INSERT INTO users (UserName, PasswordHash, SecurityStamp, Email, EmailConfirmed,
                PhoneNumber, PhoneNumberConfirmed, AccessFailedCount, LockoutEnabled,
                LockoutEndDateUtc, TwoFactorEnabled)
             VALUES (@name, @pwdHash, @secStamp, @email, @emailConfirmed, @phoneNumber,
                @phoneNumberConfirmed, @accessCount, @lockoutEnabled, @lockoutEndDate,
                @twoFactorEnabled)",
            &write_params(user),
        )?;
        user.id = id;
        Ok(id)
    }

    pub fn delete(&self, user: &User) -> DbResult<usize> {
        self.delete_by_id(user.id)
    }

    fn delete_by_id(&self, user_id: UserId) -> DbResult<usize> {
        self.db.execute(
            "DELETE FROM users WHERE Id = @userId",
            &Parameters::new().with("@userId", user_id),
        )
    }

    pub fn update(&self, user: &User) -> DbResult<usize> {
        self.db.execute(
            "UPDATE users SET
                UserName = @name, PasswordHash = @pwdHash, SecurityStamp = @secStamp,
                Email = @email, EmailConfirmed = @emailConfirmed,
                PhoneNumber = @phoneNumber, PhoneNumberConfirmed = @phoneNumberConfirmed,
                AccessFailedCount = @accessCount, LockoutEnabled = @lockoutEnabled,
                LockoutEndDateUtc = @lockoutEndDate, TwoFactorEnabled = @twoFactorEnabled
             WHERE Id = @userId",
            &write_params(user).with("@userId", user.id),
        )
    }
}

fn write_params(user: &User) -> Parameters {
    Parameters::new()
        .with("@name", user.user_name.as_str())
        .with("@pwdHash", user.password_hash.as_deref())
        .with("@secStamp", user.security_stamp.as_deref())
        .with("@email", user.email.as_deref())
        .with("@emailConfirmed", user.email_confirmed)
        .with("@phoneNumber", user.phone_number.as_deref())
        .with("@phoneNumberConfirmed", user.phone_number_confirmed)
        .with("@accessCount", user.access_failed_count)
        .with("@lockoutEnabled", user.lockout_enabled)
        .with("@lockoutEndDate", user.lockout_end_date_utc)
        .with("@twoFactorEnabled", user.two_factor_enabled)
}

fn read_user(row: &dyn Record) -> DbResult<User> {
    Ok(User {
        id: row.get_i64("Id")?,
        user_name: row.get_string("UserName")?,
        email: row.get_string_nullable("Email")?,
        email_confirmed: row.get_bool("EmailConfirmed")?,
        password_hash: row.get_string_nullable("PasswordHash")?,
        security_stamp: row.get_string_nullable("SecurityStamp")?,
        phone_number: row.get_string_nullable("PhoneNumber")?,
        phone_number_confirmed: row.get_bool("PhoneNumberConfirmed")?,
        two_factor_enabled: row.get_bool("TwoFactorEnabled")?,
        lockout_end_date_utc: row.get_i64_nullable("LockoutEndDateUtc")?,
        lockout_enabled: row.get_bool("LockoutEnabled")?,
        access_failed_count: row.get_i32("AccessFailedCount")?,
    })
}
