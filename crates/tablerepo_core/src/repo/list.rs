//! Whole-table scan capability.

use super::{log_operation, with_session, RepoResult, Repository};
use crate::db::Session;
use std::time::Instant;

/// Lists every object of the repository's model.
pub trait ListRepository: Repository {
    /// Returns all rows in storage order, which is not guaranteed to be
    /// stable across calls.
    fn list_all(&self, session: Option<&mut Session>) -> RepoResult<Vec<Self::Model>> {
        let started_at = Instant::now();
        let scoped = session.is_none();
        let result = with_session(self.database(), session, |session| self.list_all_with(session));
        log_operation::<Self::Model, _>("list_all", started_at, scoped, &result);
        result
    }

    fn list_all_with(&self, session: &mut Session) -> RepoResult<Vec<Self::Model>> {
        Ok(session.scan::<Self::Model>()?)
    }
}
