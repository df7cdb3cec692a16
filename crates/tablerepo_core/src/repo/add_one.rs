//! Single insert capability.

use super::{log_operation, with_session, RepoResult, Repository};
use crate::db::Session;
use std::time::Instant;

/// Inserts one object.
pub trait AddOneRepository: Repository {
    /// Inserts `obj`, commits, and returns it refreshed from storage so
    /// generated keys and stored values are visible.
    ///
    /// Constraint violations and connectivity failures propagate as
    /// `RepoError::Db` with the driver error inside.
    fn add_one(&self, obj: Self::Model, session: Option<&mut Session>) -> RepoResult<Self::Model> {
        let started_at = Instant::now();
        let scoped = session.is_none();
        let result = with_session(self.database(), session, |session| self.add_one_with(session, obj));
        log_operation::<Self::Model, _>("add_one", started_at, scoped, &result);
        result
    }

    fn add_one_with(&self, session: &mut Session, mut obj: Self::Model) -> RepoResult<Self::Model> {
        session.add(&mut obj)?;
        session.commit()?;
        session.refresh(&mut obj)?;
        Ok(obj)
    }
}
