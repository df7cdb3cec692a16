//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `tablerepo_core` linkage and print its version.
//! - Run one create/add/retrieve round trip against a database URL
//!   (first argument, a private SQLite database when omitted).

use tablerepo_core::{
    AddOneRepository, ColumnDef, ColumnType, Database, MapError, Model, Record, RetrieveRepository,
    TableDef, TableRepository, Value,
};

static SMOKE_ROWS: TableDef = TableDef::new(
    "tablerepo_smoke",
    &[
        ColumnDef::new("id", ColumnType::Integer)
            .primary_key()
            .generated(),
        ColumnDef::new("label", ColumnType::Text),
    ],
);

struct SmokeRow {
    id: Option<i64>,
    label: String,
}

impl Model for SmokeRow {
    type Key = i64;

    fn table() -> &'static TableDef {
        &SMOKE_ROWS
    }

    fn to_values(&self) -> Vec<Value> {
        vec![self.id.into(), self.label.as_str().into()]
    }

    fn from_record(record: &Record) -> Result<Self, MapError> {
        Ok(Self {
            id: record.get("id")?,
            label: record.get("label")?,
        })
    }

    fn set_field(&mut self, field: &str, value: Value) -> Result<(), MapError> {
        match field {
            "id" => self.id = value.decode()?,
            "label" => self.label = value.decode()?,
            other => {
                return Err(MapError::UnknownField {
                    table: SMOKE_ROWS.name,
                    field: other.to_string(),
                })
            }
        }
        Ok(())
    }
}

fn round_trip(url: &str) -> Result<String, Box<dyn std::error::Error>> {
    let database = Database::with_default_schema(url)?;
    let repo = TableRepository::<SmokeRow>::try_new(&database)?;
    database.create_tables()?;

    let stored = repo.add_one(
        SmokeRow {
            id: None,
            label: "smoke".to_string(),
        },
        None,
    )?;
    let id = stored.id.ok_or("storage did not assign an id")?;
    let loaded = repo.retrieve(id, None)?;
    Ok(format!("id={} label={}", id, loaded.label))
}

fn main() {
    println!("tablerepo_core ping={}", tablerepo_core::ping());
    println!("tablerepo_core version={}", tablerepo_core::core_version());

    let url = std::env::args().nth(1).unwrap_or_else(|| "sqlite://".to_string());
    match round_trip(&url) {
        Ok(summary) => println!("tablerepo_core round_trip {summary}"),
        Err(err) => {
            eprintln!("tablerepo_core round_trip failed: {err}");
            std::process::exit(1);
        }
    }
}
