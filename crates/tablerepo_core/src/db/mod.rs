//! Database connection context, sessions and connection building.
//!
//! # Responsibility
//! - Turn a connection URL into a `Database` (engine + model registry).
//! - Hand out short-lived `Session`s with guaranteed release.
//! - Build PostgreSQL connection URLs from discrete parameters.
//!
//! # Invariants
//! - One session factory per `Database`; sessions are never shared.
//! - A session opened by this layer is closed on every exit path.
//! - Credentials never appear in log output.

use crate::mapper::MapError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod builder;
mod context;
mod options;
mod session;
pub mod url;

pub use builder::{BuildError, PostgresDbBuilder};
pub use context::Database;
pub use options::EngineOptions;
pub use session::Session;
pub use url::{Backend, DatabaseUrl};

pub type DbResult<T> = Result<T, DbError>;

/// Driver and unit-of-work errors.
///
/// Driver errors (constraint violations, connectivity, type mismatches)
/// are carried unchanged so callers can inspect them.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    #[cfg(feature = "postgres")]
    Postgres(postgres::Error),
    Mapping(MapError),
    /// The session was already closed by its owner.
    SessionClosed,
    /// `refresh` found no row for an object that should exist.
    RowMissing { table: String, key: String },
    /// Backing storage for a private SQLite database could not be created.
    Storage(std::io::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            #[cfg(feature = "postgres")]
            Self::Postgres(err) => write!(f, "{err}"),
            Self::Mapping(err) => write!(f, "{err}"),
            Self::SessionClosed => write!(f, "session is closed"),
            Self::RowMissing { table, key } => write!(
                f,
                "could not refresh object with primary key {key}: row is gone from table {table}"
            ),
            Self::Storage(err) => write!(f, "cannot prepare private database storage: {err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            #[cfg(feature = "postgres")]
            Self::Postgres(err) => Some(err),
            Self::Mapping(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::SessionClosed | Self::RowMissing { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

#[cfg(feature = "postgres")]
impl From<postgres::Error> for DbError {
    fn from(value: postgres::Error) -> Self {
        Self::Postgres(value)
    }
}

impl From<MapError> for DbError {
    fn from(value: MapError) -> Self {
        Self::Mapping(value)
    }
}

/// Failure to construct a `Database`.
///
/// Every construction problem surfaces as this one type; the underlying
/// cause stays reachable through `source()`.
#[derive(Debug)]
pub enum ConstructionError {
    InvalidUrl(String),
    /// The URL names a backend this build cannot speak.
    UnsupportedBackend(String),
    InvalidSchema(String),
    /// The backend has no notion of the requested schema.
    UnsupportedSchema { backend: &'static str, schema: String },
    Engine(DbError),
}

impl Display for ConstructionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUrl(reason) => write!(f, "invalid connection url: {reason}"),
            Self::UnsupportedBackend(scheme) => {
                write!(f, "unsupported database backend `{scheme}`")
            }
            Self::InvalidSchema(schema) => write!(f, "invalid schema name `{schema}`"),
            Self::UnsupportedSchema { backend, schema } => {
                write!(f, "{backend} databases have no schema `{schema}`")
            }
            Self::Engine(err) => write!(f, "failed to create database engine: {err}"),
        }
    }
}

impl Error for ConstructionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Engine(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for ConstructionError {
    fn from(value: DbError) -> Self {
        Self::Engine(value)
    }
}
