//! Table mapping contracts.
//!
//! # Responsibility
//! - Describe table shape as `const` data (`TableDef`, `ColumnDef`).
//! - Define the `Model` contract each mapped struct implements.
//! - Expose primary-key introspection for update/delete paths.

use super::{FromValue, MapError, MapResult, Value};
use std::fmt::Display;

/// Storage type of one mapped column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Blob,
    Boolean,
}

/// One mapped column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnType,
    pub primary_key: bool,
    pub nullable: bool,
    /// Value is assigned by storage when the object carries `NULL`.
    pub generated: bool,
}

impl ColumnDef {
    pub const fn new(name: &'static str, kind: ColumnType) -> Self {
        Self {
            name,
            kind,
            primary_key: false,
            nullable: false,
            generated: false,
        }
    }

    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Marks an integer primary key as storage-generated.
    pub const fn generated(mut self) -> Self {
        self.generated = true;
        self
    }
}

/// Static description of one mapped table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
}

impl TableDef {
    pub const fn new(name: &'static str, columns: &'static [ColumnDef]) -> Self {
        Self { name, columns }
    }

    /// All primary-key columns, in declaration order.
    pub fn primary_key_columns(&self) -> impl Iterator<Item = &'static ColumnDef> {
        self.columns.iter().filter(|column| column.primary_key)
    }

    /// The primary-key column this system addresses rows by.
    pub fn primary_key(&self) -> MapResult<&'static ColumnDef> {
        self.primary_key_columns()
            .next()
            .ok_or(MapError::PrimaryKey {
                table: self.name,
                reason: "no primary-key column declared",
            })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&'static ColumnDef> {
        self.columns.iter().find(|column| column.name == name)
    }
}

/// One fetched row, aligned to its table's column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    table: &'static TableDef,
    values: Vec<Value>,
}

impl Record {
    pub(crate) fn new(table: &'static TableDef, values: Vec<Value>) -> Self {
        Self { table, values }
    }

    /// Decodes the named column.
    pub fn get<T: FromValue>(&self, name: &str) -> MapResult<T> {
        let index = self
            .table
            .column_index(name)
            .ok_or_else(|| MapError::UnknownField {
                table: self.table.name,
                field: name.to_string(),
            })?;
        let value = self.values.get(index).cloned().unwrap_or(Value::Null);
        T::from_value(value).map_err(|err| MapError::Field {
            field: name.to_string(),
            source: Box::new(err),
        })
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

/// A struct mapped onto exactly one table.
///
/// Field names are column names: `set_field("name", ..)` assigns the value
/// stored in column `name`.
pub trait Model: Sized {
    /// Primary-key type accepted by repository lookups.
    type Key: Clone + Display + Into<Value>;

    fn table() -> &'static TableDef;

    /// Column values in `table().columns` order.
    fn to_values(&self) -> Vec<Value>;

    fn from_record(record: &Record) -> MapResult<Self>;

    /// Assigns one field by name.
    ///
    /// # Errors
    /// - `MapError::UnknownField` for names the model does not map.
    /// - `MapError::TypeMismatch` when the value cannot be decoded.
    fn set_field(&mut self, field: &str, value: Value) -> MapResult<()>;

    /// Current primary-key value, `Value::Null` when storage has not
    /// assigned one yet.
    fn primary_key_value(&self) -> MapResult<Value> {
        let table = Self::table();
        let pk = table.primary_key()?;
        let index = table.column_index(pk.name).unwrap_or(0);
        Ok(self.column_values()?.swap_remove(index))
    }

    /// `to_values`, checked to hold exactly one value per column.
    ///
    /// # Errors
    /// - `MapError::ValueCount` when the lengths differ.
    fn column_values(&self) -> MapResult<Vec<Value>> {
        let table = Self::table();
        let values = self.to_values();
        if values.len() != table.columns.len() {
            return Err(MapError::ValueCount {
                table: table.name,
                expected: table.columns.len(),
                found: values.len(),
            });
        }
        Ok(values)
    }
}
