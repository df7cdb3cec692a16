//! Batch insert capability.

use super::{log_operation, with_session, RepoResult, Repository};
use crate::db::Session;
use std::time::Instant;

/// Inserts a batch of objects in one unit of work.
pub trait AddManyRepository: Repository {
    /// Inserts every object and commits once.
    ///
    /// Returns `None` unless `with_return` is set, in which case each object
    /// is refreshed from storage and returned. Refreshing costs one query
    /// per object, so large batches should leave `with_return` off.
    fn add_many(
        &self,
        objects: Vec<Self::Model>,
        with_return: bool,
        session: Option<&mut Session>,
    ) -> RepoResult<Option<Vec<Self::Model>>> {
        let started_at = Instant::now();
        let scoped = session.is_none();
        let result = with_session(self.database(), session, |session| {
            self.add_many_with(session, objects, with_return)
        });
        log_operation::<Self::Model, _>("add_many", started_at, scoped, &result);
        result
    }

    fn add_many_with(
        &self,
        session: &mut Session,
        mut objects: Vec<Self::Model>,
        with_return: bool,
    ) -> RepoResult<Option<Vec<Self::Model>>> {
        session.add_all(&mut objects)?;
        session.commit()?;
        if !with_return {
            return Ok(None);
        }
        for obj in objects.iter_mut() {
            session.refresh(obj)?;
        }
        Ok(Some(objects))
    }
}
