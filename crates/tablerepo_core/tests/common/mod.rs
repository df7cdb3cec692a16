#![allow(dead_code)]

use tablerepo_core::{
    ColumnDef, ColumnType, Database, MapError, Model, Record, TableDef, TableRepository, Value,
};

pub static USERS: TableDef = TableDef::new(
    "users",
    &[
        ColumnDef::new("id", ColumnType::Integer)
            .primary_key()
            .generated(),
        ColumnDef::new("name", ColumnType::Text),
        ColumnDef::new("email", ColumnType::Text).nullable(),
        ColumnDef::new("active", ColumnType::Boolean),
    ],
);

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Option<i64>,
    pub name: String,
    pub email: Option<String>,
    pub active: bool,
}

impl User {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            email: None,
            active: true,
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }
}

impl Model for User {
    type Key = i64;

    fn table() -> &'static TableDef {
        &USERS
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            self.name.as_str().into(),
            self.email.clone().into(),
            self.active.into(),
        ]
    }

    fn from_record(record: &Record) -> Result<Self, MapError> {
        Ok(Self {
            id: record.get("id")?,
            name: record.get("name")?,
            email: record.get("email")?,
            active: record.get("active")?,
        })
    }

    fn set_field(&mut self, field: &str, value: Value) -> Result<(), MapError> {
        match field {
            "id" => self.id = value.decode()?,
            "name" => self.name = value.decode()?,
            "email" => self.email = value.decode()?,
            "active" => self.active = value.decode()?,
            other => {
                return Err(MapError::UnknownField {
                    table: USERS.name,
                    field: other.to_string(),
                })
            }
        }
        Ok(())
    }
}

pub static TAGS: TableDef = TableDef::new(
    "tags",
    &[
        ColumnDef::new("name", ColumnType::Text).primary_key(),
        ColumnDef::new("weight", ColumnType::Integer),
    ],
);

#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
    pub weight: i64,
}

impl Tag {
    pub fn new(name: &str, weight: i64) -> Self {
        Self {
            name: name.to_string(),
            weight,
        }
    }
}

impl Model for Tag {
    type Key = String;

    fn table() -> &'static TableDef {
        &TAGS
    }

    fn to_values(&self) -> Vec<Value> {
        vec![self.name.as_str().into(), self.weight.into()]
    }

    fn from_record(record: &Record) -> Result<Self, MapError> {
        Ok(Self {
            name: record.get("name")?,
            weight: record.get("weight")?,
        })
    }

    fn set_field(&mut self, field: &str, value: Value) -> Result<(), MapError> {
        match field {
            "name" => self.name = value.decode()?,
            "weight" => self.weight = value.decode()?,
            other => {
                return Err(MapError::UnknownField {
                    table: TAGS.name,
                    field: other.to_string(),
                })
            }
        }
        Ok(())
    }
}

pub fn private_database() -> Database {
    Database::with_default_schema("sqlite://").unwrap()
}

/// Private database with `users` and `tags` created.
pub fn seeded_database() -> Database {
    let database = private_database();
    database.get_base().register::<User>().unwrap();
    database.get_base().register::<Tag>().unwrap();
    database.create_tables().unwrap();
    database
}

pub fn user_repo(database: &Database) -> TableRepository<'_, User> {
    TableRepository::try_new(database).unwrap()
}

pub fn tag_repo(database: &Database) -> TableRepository<'_, Tag> {
    TableRepository::try_new(database).unwrap()
}
