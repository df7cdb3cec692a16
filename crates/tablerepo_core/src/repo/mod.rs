//! Repository base contract and capability traits.
//!
//! # Responsibility
//! - Bind one model to one `Database`.
//! - Apply the "caller session or scoped session" policy in one place.
//! - Offer six independent CRUD capabilities a repository can opt into.
//!
//! # Invariants
//! - A caller-supplied session is used as-is and never closed here.
//! - Without a caller session, exactly one scoped session is opened and
//!   always closed, including when the operation fails.
//! - Repository APIs return semantic errors (`NotFound`) in addition to
//!   driver errors, which pass through unchanged.

use crate::db::{Database, DbError, Session};
use crate::mapper::{MapError, Model, Value};
use log::{debug, error};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub mod add_many;
pub mod add_one;
pub mod delete_one;
pub mod list;
pub mod retrieve;
pub mod table_repo;
pub mod update;

pub use add_many::AddManyRepository;
pub use add_one::AddOneRepository;
pub use delete_one::DeleteOneRepository;
pub use list::ListRepository;
pub use retrieve::RetrieveRepository;
pub use table_repo::TableRepository;
pub use update::UpdateRepository;

pub type RepoResult<T> = Result<T, RepoError>;

/// Primary-key type of a repository's model.
pub type KeyOf<R> = <<R as Repository>::Model as Model>::Key;

/// Field name to new value, applied by `update_one`.
pub type UpdateValues = BTreeMap<String, Value>;

/// Repository operation error.
#[derive(Debug)]
pub enum RepoError {
    /// No row with `key` exists in `table`.
    NotFound { table: String, key: String },
    Db(DbError),
    Mapping(MapError),
}

impl RepoError {
    pub(crate) fn not_found<M: Model>(key: &M::Key) -> Self {
        Self::NotFound {
            table: M::table().name.to_string(),
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { table, key } => {
                write!(f, "no object with primary key {key} exists on table {table}")
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::Mapping(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound { .. } => None,
            Self::Db(err) => Some(err),
            Self::Mapping(err) => Some(err),
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Mapping(err) => Self::Mapping(err),
            other => Self::Db(other),
        }
    }
}

impl From<MapError> for RepoError {
    fn from(value: MapError) -> Self {
        Self::Mapping(value)
    }
}

/// Base contract: one model bound to one database.
pub trait Repository {
    type Model: Model;

    fn database(&self) -> &Database;
}

/// Runs `work` in the caller's session, or in a scoped one when `session`
/// is `None`.
///
/// The caller's session is neither committed nor closed here beyond what
/// `work` itself does; a scoped session is always closed.
pub fn with_session<T, F>(
    database: &Database,
    session: Option<&mut Session>,
    work: F,
) -> RepoResult<T>
where
    F: FnOnce(&mut Session) -> RepoResult<T>,
{
    match session {
        Some(session) => work(session),
        None => database.get_database_session(work),
    }
}

/// Logs the outcome of one repository operation.
pub(crate) fn log_operation<M: Model, T>(
    op: &str,
    started_at: Instant,
    scoped: bool,
    result: &RepoResult<T>,
) {
    let table = M::table().name;
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(_) => debug!(
            "event=repo_op module=repo op={} table={} scoped={} status=ok duration_ms={}",
            op, table, scoped, duration_ms
        ),
        Err(RepoError::NotFound { key, .. }) => debug!(
            "event=repo_op module=repo op={} table={} scoped={} status=not_found key={} duration_ms={}",
            op, table, scoped, key, duration_ms
        ),
        Err(err) => error!(
            "event=repo_op module=repo op={} table={} scoped={} status=error duration_ms={} error={}",
            op, table, scoped, duration_ms, err
        ),
    }
}
