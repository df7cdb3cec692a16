//! Partial update capability.
//!
//! # Invariants
//! - The primary key is immutable through this path: a primary-key entry
//!   in the update mapping is dropped silently.
//! - Unknown fields fail before any statement is issued.

use super::{log_operation, with_session, KeyOf, RepoError, RepoResult, Repository, UpdateValues};
use crate::db::Session;
use crate::mapper::{MapError, Model};
use std::time::Instant;

/// Updates one object's fields by primary key.
pub trait UpdateRepository: Repository {
    /// Applies `update_values` to the object stored under `pk`, commits,
    /// and returns the refreshed object.
    ///
    /// # Errors
    /// - `RepoError::NotFound` when no row matches `pk`.
    /// - `RepoError::Mapping` for unknown fields or undecodable values.
    fn update_one(
        &self,
        pk: KeyOf<Self>,
        update_values: UpdateValues,
        session: Option<&mut Session>,
    ) -> RepoResult<Self::Model> {
        let started_at = Instant::now();
        let scoped = session.is_none();
        let result = with_session(self.database(), session, |session| {
            self.update_one_with(session, &pk, update_values)
        });
        log_operation::<Self::Model, _>("update_one", started_at, scoped, &result);
        result
    }

    fn update_one_with(
        &self,
        session: &mut Session,
        pk: &KeyOf<Self>,
        mut update_values: UpdateValues,
    ) -> RepoResult<Self::Model> {
        let table = <Self::Model as Model>::table();
        let mut obj = session
            .get::<Self::Model>(pk.clone())?
            .ok_or_else(|| RepoError::not_found::<Self::Model>(pk))?;

        update_values.remove(table.primary_key()?.name);

        let mut columns = Vec::with_capacity(update_values.len());
        for (field, value) in update_values {
            let Some(column) = table.column(&field) else {
                return Err(MapError::UnknownField {
                    table: table.name,
                    field,
                }
                .into());
            };
            obj.set_field(column.name, value)?;
            columns.push(column.name);
        }

        session.update_columns(&obj, &columns)?;
        session.commit()?;
        session.refresh(&mut obj)?;
        Ok(obj)
    }
}
