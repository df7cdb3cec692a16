//! Primary-key delete capability.

use super::{log_operation, with_session, KeyOf, RepoError, RepoResult, Repository};
use crate::db::Session;
use std::time::Instant;

/// Deletes one object by primary key.
pub trait DeleteOneRepository: Repository {
    /// Deletes the row stored under `pk` and commits.
    ///
    /// # Errors
    /// - `RepoError::NotFound` when no row matches; nothing is written.
    fn delete_one(&self, pk: KeyOf<Self>, session: Option<&mut Session>) -> RepoResult<()> {
        let started_at = Instant::now();
        let scoped = session.is_none();
        let result = with_session(self.database(), session, |session| {
            self.delete_one_with(session, &pk)
        });
        log_operation::<Self::Model, _>("delete_one", started_at, scoped, &result);
        result
    }

    fn delete_one_with(&self, session: &mut Session, pk: &KeyOf<Self>) -> RepoResult<()> {
        if session.get::<Self::Model>(pk.clone())?.is_none() {
            return Err(RepoError::not_found::<Self::Model>(pk));
        }
        session.delete::<Self::Model>(pk.clone())?;
        session.commit()?;
        Ok(())
    }
}
