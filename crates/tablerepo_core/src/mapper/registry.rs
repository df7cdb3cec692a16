//! Model registry and schema metadata owned by one database context.
//!
//! # Responsibility
//! - Validate model mappings before any SQL is rendered from them.
//! - Keep the set of tables that `create_tables` materializes.
//!
//! # Invariants
//! - Registration is idempotent for an identical mapping.
//! - A table name maps to exactly one `TableDef` per registry.
//! - Only validated identifiers ever reach SQL text.

use super::{ColumnType, Dialect, MapError, MapResult, Model, TableDef};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::{PoisonError, RwLock};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Returns whether `name` is a plain SQL identifier.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// Schema-level view of all registered tables.
///
/// Handed to migration tooling; rendering DDL has no side effects.
#[derive(Debug)]
pub struct MetaData {
    schema: String,
    dialect: Dialect,
    tables: RwLock<Vec<&'static TableDef>>,
}

impl MetaData {
    pub(crate) fn new(schema: impl Into<String>, dialect: Dialect) -> Self {
        Self {
            schema: schema.into(),
            dialect,
            tables: RwLock::new(Vec::new()),
        }
    }

    /// Schema name this metadata was created with.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Schema used to qualify table names in SQL, if the backend has schemas.
    pub fn schema_qualifier(&self) -> Option<&str> {
        match self.dialect {
            Dialect::Sqlite => None,
            Dialect::Postgres => Some(self.schema.as_str()),
        }
    }

    /// Quoted, schema-qualified name of `table`.
    pub fn qualified_name(&self, table: &TableDef) -> String {
        self.dialect
            .qualified_table(self.schema_qualifier(), table.name)
    }

    /// Registered tables in registration order.
    pub fn tables(&self) -> Vec<&'static TableDef> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|table| table.name == name)
    }

    /// `CREATE TABLE IF NOT EXISTS` statements for every registered table.
    pub fn create_statements(&self) -> Vec<String> {
        self.tables()
            .into_iter()
            .map(|table| self.dialect.create_table(self.schema_qualifier(), table))
            .collect()
    }

    fn insert(&self, table: &'static TableDef) -> MapResult<bool> {
        let mut tables = self
            .tables
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = tables.iter().find(|existing| existing.name == table.name) {
            if **existing == *table {
                return Ok(false);
            }
            return Err(MapError::TableConflict(table.name));
        }
        tables.push(table);
        Ok(true)
    }
}

/// Declarative base that models register against.
#[derive(Debug)]
pub struct ModelRegistry {
    metadata: MetaData,
}

impl ModelRegistry {
    pub(crate) fn new(schema: impl Into<String>, dialect: Dialect) -> Self {
        Self {
            metadata: MetaData::new(schema, dialect),
        }
    }

    pub fn metadata(&self) -> &MetaData {
        &self.metadata
    }

    /// Registers `M`'s mapping after validating it.
    ///
    /// Returns `true` when the table was newly registered.
    ///
    /// # Errors
    /// - `MapError::InvalidIdentifier` for table/column names outside
    ///   `[A-Za-z_][A-Za-z0-9_]*`.
    /// - `MapError::PrimaryKey` unless exactly one primary-key column exists.
    /// - `MapError::InvalidColumn` for generated non-integer or non-key columns.
    /// - `MapError::TableConflict` when another mapping owns the name.
    pub fn register<M: Model>(&self) -> MapResult<bool> {
        self.register_table(M::table())
    }

    pub fn register_table(&self, table: &'static TableDef) -> MapResult<bool> {
        validate_table(table)?;
        self.metadata.insert(table)
    }
}

fn validate_table(table: &'static TableDef) -> MapResult<()> {
    if !is_identifier(table.name) {
        return Err(MapError::InvalidIdentifier(table.name.to_string()));
    }
    if table.columns.is_empty() {
        return Err(MapError::PrimaryKey {
            table: table.name,
            reason: "table declares no columns",
        });
    }

    for (index, column) in table.columns.iter().enumerate() {
        if !is_identifier(column.name) {
            return Err(MapError::InvalidIdentifier(column.name.to_string()));
        }
        if table.columns[..index]
            .iter()
            .any(|earlier| earlier.name == column.name)
        {
            return Err(MapError::InvalidColumn {
                table: table.name,
                column: column.name,
                reason: "declared twice",
            });
        }
        if column.generated && !(column.primary_key && column.kind == ColumnType::Integer) {
            return Err(MapError::InvalidColumn {
                table: table.name,
                column: column.name,
                reason: "only integer primary keys can be generated",
            });
        }
    }

    match table.primary_key_columns().count() {
        1 => Ok(()),
        0 => Err(MapError::PrimaryKey {
            table: table.name,
            reason: "no primary-key column declared",
        }),
        _ => Err(MapError::PrimaryKey {
            table: table.name,
            reason: "composite primary keys are not supported",
        }),
    }
}
