//! Connection context: engine, session factory and model registry.
//!
//! # Responsibility
//! - Own everything needed to reach one database and open units of work.
//! - Provide scoped session acquisition with guaranteed release.
//! - Materialize registered tables.
//!
//! # Invariants
//! - Exactly one session factory per `Database`, created at construction.
//! - A session opened by `get_database_session` is closed before it
//!   returns, whatever the unit of work did.
//!
//! # See also
//! - `crate::repo` for the session-or-scope policy built on top of this.

use super::options::EngineOptions;
use super::session::{Session, SessionFactory};
use super::url::DatabaseUrl;
use super::{ConstructionError, DbError, DbResult};
use crate::mapper::{is_identifier, Dialect, MetaData, ModelRegistry};
use log::{error, info, warn};
use std::time::Instant;

/// Schema used when the caller does not name one.
pub const DEFAULT_SCHEMA: &str = "public";

/// Handle to one database: URL, model registry and session factory.
///
/// Meant to be created once per process (or per logical database) and
/// shared by every repository bound to it.
#[derive(Debug)]
pub struct Database {
    url: DatabaseUrl,
    registry: ModelRegistry,
    sessions: SessionFactory,
}

impl Database {
    /// Creates a context for `url` with default engine options.
    ///
    /// # Errors
    /// - `ConstructionError` for malformed URLs, unsupported backends,
    ///   invalid schemas or engine creation failures.
    pub fn new(url: &str, schema: &str) -> Result<Self, ConstructionError> {
        Self::with_options(url, schema, EngineOptions::default())
    }

    /// Creates a context for `url` using the `public` schema.
    pub fn with_default_schema(url: &str) -> Result<Self, ConstructionError> {
        Self::new(url, DEFAULT_SCHEMA)
    }

    pub fn with_options(
        url: &str,
        schema: &str,
        options: EngineOptions,
    ) -> Result<Self, ConstructionError> {
        let started_at = Instant::now();
        match Self::construct(url, schema, &options) {
            Ok(database) => {
                info!(
                    "event=db_construct module=db status=ok backend={} url={} schema={} duration_ms={}",
                    database.dialect().name(),
                    database.url(),
                    schema,
                    started_at.elapsed().as_millis()
                );
                Ok(database)
            }
            Err(err) => {
                error!(
                    "event=db_construct module=db status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn construct(
        url: &str,
        schema: &str,
        options: &EngineOptions,
    ) -> Result<Self, ConstructionError> {
        let url = DatabaseUrl::parse(url)?;
        let schema = schema.trim();
        if !is_identifier(schema) {
            return Err(ConstructionError::InvalidSchema(schema.to_string()));
        }

        let dialect = url.dialect();
        let qualifier = match dialect {
            // SQLite has one schema per connection; `public` is accepted as
            // the portable spelling of it.
            Dialect::Sqlite if schema == DEFAULT_SCHEMA || schema == "main" => None,
            Dialect::Sqlite => {
                return Err(ConstructionError::UnsupportedSchema {
                    backend: dialect.name(),
                    schema: schema.to_string(),
                })
            }
            Dialect::Postgres => Some(schema.to_string()),
        };

        let sessions = SessionFactory::new(&url, qualifier, options)?;
        Ok(Self {
            url,
            registry: ModelRegistry::new(schema, dialect),
            sessions,
        })
    }

    /// Connection URL with the password redacted.
    pub fn url(&self) -> String {
        self.url.redacted()
    }

    pub fn database_url(&self) -> &DatabaseUrl {
        &self.url
    }

    pub fn dialect(&self) -> Dialect {
        self.url.dialect()
    }

    /// Schema metadata, e.g. for migration tooling.
    pub fn get_metadata(&self) -> &MetaData {
        self.registry.metadata()
    }

    /// The model registry that models register against.
    pub fn get_base(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Issues `CREATE TABLE IF NOT EXISTS` for every registered model.
    ///
    /// All statements run in one unit of work.
    pub fn create_tables(&self) -> DbResult<()> {
        let started_at = Instant::now();
        let statements = self.get_metadata().create_statements();
        let table_count = statements.len();

        let outcome = self.get_database_session(|session: &mut Session| {
            session.execute_ddl(&statements)?;
            session.commit()
        });

        match &outcome {
            Ok(()) => info!(
                "event=create_tables module=db status=ok tables={} duration_ms={}",
                table_count,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=create_tables module=db status=error tables={} duration_ms={} error={}",
                table_count,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        outcome
    }

    /// Opens a session owned by the caller.
    ///
    /// The session closes when dropped; call `Session::close` to observe
    /// close errors.
    pub fn session(&self) -> DbResult<Session> {
        self.sessions.open()
    }

    /// Runs `work` inside a fresh session and closes it afterwards.
    ///
    /// The session is closed on success, on error and on panic (via drop).
    /// Uncommitted writes are rolled back. When `work` fails, its error is
    /// returned even if closing also fails.
    pub fn get_database_session<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut Session) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut session = self.sessions.open()?;
        let outcome = work(&mut session);
        let closed = session.close();

        match (outcome, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(close_err)) => Err(close_err.into()),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                warn!(
                    "event=session_scope module=db status=error session_id={} close_error={}",
                    session.id(),
                    close_err
                );
                Err(err)
            }
        }
    }

    /// Number of sessions currently open against this database.
    pub fn open_session_count(&self) -> usize {
        self.sessions.open_sessions()
    }
}

#[cfg(test)]
mod tests {
    use super::Database;
    use crate::db::{ConstructionError, DbError};

    #[test]
    fn sqlite_rejects_foreign_schema_names() {
        let err = Database::new("sqlite://", "inventory").unwrap_err();
        assert!(matches!(
            err,
            ConstructionError::UnsupportedSchema { ref schema, .. } if schema == "inventory"
        ));
        assert!(Database::new("sqlite://", "main").is_ok());
    }

    #[test]
    fn schema_must_be_an_identifier() {
        let err = Database::new("sqlite://", "public; drop").unwrap_err();
        assert!(matches!(err, ConstructionError::InvalidSchema(_)));
    }

    #[test]
    fn scoped_session_is_closed_when_work_fails() {
        let database = Database::with_default_schema("sqlite://").unwrap();
        let result: Result<(), DbError> =
            database.get_database_session(|_session| Err(DbError::SessionClosed));
        assert!(matches!(result, Err(DbError::SessionClosed)));
        assert_eq!(database.open_session_count(), 0);
    }
}
