//! Declarative table mapping used by sessions and repositories.
//!
//! # Responsibility
//! - Describe how a Rust struct maps onto one table (`Model`, `TableDef`).
//! - Carry dynamically typed column values between drivers and models.
//! - Own the per-database model registry and its DDL rendering.
//!
//! # Invariants
//! - Every registered table has exactly one primary-key column.
//! - Table, column and schema names are plain SQL identifiers.
//! - A model's field name is its column name.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod dialect;
pub mod registry;
pub mod table;
pub mod value;

pub use dialect::Dialect;
pub use registry::{is_identifier, MetaData, ModelRegistry};
pub use table::{ColumnDef, ColumnType, Model, Record, TableDef};
pub use value::{FromValue, Value};

pub type MapResult<T> = Result<T, MapError>;

/// Errors raised while mapping rows and values onto models.
#[derive(Debug, Clone, PartialEq)]
pub enum MapError {
    /// A field name that the model does not map.
    UnknownField { table: &'static str, field: String },
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// Decoding one named field failed.
    Field {
        field: String,
        source: Box<MapError>,
    },
    InvalidIdentifier(String),
    /// The table mapping violates the single primary-key rule.
    PrimaryKey {
        table: &'static str,
        reason: &'static str,
    },
    InvalidColumn {
        table: &'static str,
        column: &'static str,
        reason: &'static str,
    },
    /// Another mapping is already registered under the same table name.
    TableConflict(&'static str),
    /// The object carries no primary-key value, so it cannot be located.
    MissingPrimaryKey { table: &'static str },
    /// `Model::to_values` did not yield one value per column.
    ValueCount {
        table: &'static str,
        expected: usize,
        found: usize,
    },
}

impl Display for MapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownField { table, field } => {
                write!(f, "table {table} has no field `{field}`")
            }
            Self::TypeMismatch { expected, found } => {
                write!(f, "expected {expected} value, found {found}")
            }
            Self::Field { field, source } => write!(f, "field `{field}`: {source}"),
            Self::InvalidIdentifier(name) => write!(f, "invalid SQL identifier `{name}`"),
            Self::PrimaryKey { table, reason } => {
                write!(f, "table {table} primary key is invalid: {reason}")
            }
            Self::InvalidColumn {
                table,
                column,
                reason,
            } => write!(f, "column {table}.{column} is invalid: {reason}"),
            Self::TableConflict(table) => write!(
                f,
                "a different mapping is already registered for table {table}"
            ),
            Self::MissingPrimaryKey { table } => {
                write!(f, "object of table {table} has no primary key value")
            }
            Self::ValueCount {
                table,
                expected,
                found,
            } => write!(
                f,
                "model for table {table} produced {found} values for {expected} columns"
            ),
        }
    }
}

impl Error for MapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Field { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
