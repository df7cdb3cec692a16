//! Primary-key lookup capability.

use super::{log_operation, with_session, KeyOf, RepoError, RepoResult, Repository};
use crate::db::Session;
use std::time::Instant;

/// Loads exactly one object by primary key.
pub trait RetrieveRepository: Repository {
    /// Returns the object stored under `pk`.
    ///
    /// Uses `session` as-is when given; otherwise opens and closes a scoped
    /// session.
    ///
    /// # Errors
    /// - `RepoError::NotFound` (carrying `pk` and the table name) when no
    ///   row matches.
    fn retrieve(&self, pk: KeyOf<Self>, session: Option<&mut Session>) -> RepoResult<Self::Model> {
        let started_at = Instant::now();
        let scoped = session.is_none();
        let result = with_session(self.database(), session, |session| {
            self.retrieve_with(session, &pk)
        });
        log_operation::<Self::Model, _>("retrieve", started_at, scoped, &result);
        result
    }

    fn retrieve_with(&self, session: &mut Session, pk: &KeyOf<Self>) -> RepoResult<Self::Model> {
        session
            .get::<Self::Model>(pk.clone())?
            .ok_or_else(|| RepoError::not_found::<Self::Model>(pk))
    }
}
