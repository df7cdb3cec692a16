//! Ready-made repository with every capability.

use super::{
    AddManyRepository, AddOneRepository, DeleteOneRepository, ListRepository, RepoResult,
    Repository, RetrieveRepository, UpdateRepository,
};
use crate::db::Database;
use crate::mapper::Model;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

/// Repository for model `M` implementing all six capabilities.
///
/// Repositories that should expose fewer operations declare their own
/// struct and implement only the capability traits they need.
pub struct TableRepository<'db, M: Model> {
    database: &'db Database,
    _model: PhantomData<fn() -> M>,
}

impl<'db, M: Model> TableRepository<'db, M> {
    /// Binds `M` to `database`, registering its mapping.
    ///
    /// # Errors
    /// - `RepoError::Mapping` when the mapping is invalid or conflicts with
    ///   another model registered under the same table name.
    pub fn try_new(database: &'db Database) -> RepoResult<Self> {
        database.get_base().register::<M>()?;
        Ok(Self {
            database,
            _model: PhantomData,
        })
    }
}

impl<M: Model> Clone for TableRepository<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: Model> Copy for TableRepository<'_, M> {}

impl<M: Model> Debug for TableRepository<'_, M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableRepository")
            .field("table", &M::table().name)
            .field("database", &self.database.url())
            .finish()
    }
}

impl<M: Model> Repository for TableRepository<'_, M> {
    type Model = M;

    fn database(&self) -> &Database {
        self.database
    }
}

impl<M: Model> RetrieveRepository for TableRepository<'_, M> {}
impl<M: Model> ListRepository for TableRepository<'_, M> {}
impl<M: Model> AddOneRepository for TableRepository<'_, M> {}
impl<M: Model> AddManyRepository for TableRepository<'_, M> {}
impl<M: Model> UpdateRepository for TableRepository<'_, M> {}
impl<M: Model> DeleteOneRepository for TableRepository<'_, M> {}
