//! SQL dialect differences between supported backends.

use super::{ColumnDef, ColumnType, TableDef};

/// SQL flavour spoken by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    pub fn name(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgresql",
        }
    }

    /// Quotes an identifier already validated by the registry.
    pub fn quote(self, ident: &str) -> String {
        format!("\"{ident}\"")
    }

    /// Positional placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Self::Sqlite => format!("?{index}"),
            Self::Postgres => format!("${index}"),
        }
    }

    /// Schema-qualified, quoted table name.
    pub fn qualified_table(self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(schema) => format!("{}.{}", self.quote(schema), self.quote(table)),
            None => self.quote(table),
        }
    }

    pub fn column_type(self, kind: ColumnType) -> &'static str {
        match (self, kind) {
            (Self::Sqlite, ColumnType::Integer) => "INTEGER",
            (Self::Sqlite, ColumnType::Real) => "REAL",
            (Self::Sqlite, ColumnType::Text) => "TEXT",
            (Self::Sqlite, ColumnType::Blob) => "BLOB",
            // SQLite stores booleans as 0/1 integers.
            (Self::Sqlite, ColumnType::Boolean) => "INTEGER",
            (Self::Postgres, ColumnType::Integer) => "BIGINT",
            (Self::Postgres, ColumnType::Real) => "DOUBLE PRECISION",
            (Self::Postgres, ColumnType::Text) => "TEXT",
            (Self::Postgres, ColumnType::Blob) => "BYTEA",
            (Self::Postgres, ColumnType::Boolean) => "BOOLEAN",
        }
    }

    pub fn column_ddl(self, column: &ColumnDef) -> String {
        let mut ddl = format!(
            "{} {}",
            self.quote(column.name),
            self.column_type(column.kind)
        );
        if column.generated && self == Self::Postgres {
            ddl.push_str(" GENERATED BY DEFAULT AS IDENTITY");
        }
        if column.primary_key {
            // SQLite turns `INTEGER PRIMARY KEY` into the rowid alias, which is
            // what assigns generated keys there.
            ddl.push_str(" PRIMARY KEY");
        } else if !column.nullable {
            ddl.push_str(" NOT NULL");
        }
        ddl
    }

    pub fn create_table(self, schema: Option<&str>, table: &TableDef) -> String {
        let columns = table
            .columns
            .iter()
            .map(|column| self.column_ddl(column))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({columns})",
            self.qualified_table(schema, table.name)
        )
    }
}
