//! Relational data-access core for an identity store.
//! Connection lifecycle, statement execution and typed row access live in
//! `db`; the identity tables in `repo` are its first consumers.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use config::{ConfigError, DatabaseConfig, LoggingConfig, StoreConfig};
pub use db::{
    ConnectionMode, Database, DatabaseSettings, DbError, DbResult, Parameters, PerCallDatabase,
    Record, RecordExt, SharedDatabase, SqlValue,
};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::claim::Claim;
pub use model::login::UserLoginInfo;
pub use model::role::{Role, RoleId};
pub use model::user::{User, UserId};
pub use repo::role_table::RoleTable;
pub use repo::user_claims_table::UserClaimsTable;
pub use repo::user_logins_table::UserLoginsTable;
pub use repo::user_roles_table::UserRolesTable;
pub use repo::user_table::UserTable;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
