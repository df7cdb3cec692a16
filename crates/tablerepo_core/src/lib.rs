//! Generic data-access layer over SQLite and PostgreSQL.
//!
//! A `Database` owns the engine and model registry, a `Session` is one unit
//! of work, and repositories compose CRUD capabilities over a single model.
//! Every repository operation runs in the caller's session when one is
//! given and in a scoped, always-closed session otherwise.

pub mod db;
pub mod logging;
pub mod mapper;
pub mod repo;

pub use db::{
    Backend, BuildError, ConstructionError, Database, DatabaseUrl, DbError, DbResult,
    EngineOptions, PostgresDbBuilder, Session,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use mapper::{
    ColumnDef, ColumnType, Dialect, FromValue, MapError, MetaData, Model, ModelRegistry, Record,
    TableDef, Value,
};
pub use repo::{
    with_session, AddManyRepository, AddOneRepository, DeleteOneRepository, ListRepository,
    RepoError, RepoResult, Repository, RetrieveRepository, TableRepository, UpdateRepository,
    UpdateValues,
};

/// Minimal health-check API for embedding processes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
