mod common;

use common::{seeded_database, tag_repo, user_repo, Tag, User};
use tablerepo_core::{
    AddManyRepository, AddOneRepository, ColumnDef, ColumnType, DbError, DeleteOneRepository,
    ListRepository, MapError, Model, Record, RepoError, RetrieveRepository, TableDef,
    TableRepository, UpdateRepository, UpdateValues, Value,
};

#[test]
fn add_one_assigns_key_and_retrieve_returns_equal_object() {
    let database = seeded_database();
    let repo = user_repo(&database);

    let stored = repo
        .add_one(User::new("ada").with_email("ada@example.com"), None)
        .unwrap();
    let id = stored.id.unwrap();

    let loaded = repo.retrieve(id, None).unwrap();
    assert_eq!(loaded, stored);
    assert_eq!(loaded.name, "ada");
    assert_eq!(loaded.email.as_deref(), Some("ada@example.com"));
    assert!(loaded.active);
}

#[test]
fn text_primary_key_round_trips() {
    let database = seeded_database();
    let repo = tag_repo(&database);

    repo.add_one(Tag::new("rust", 3), None).unwrap();
    assert_eq!(repo.retrieve("rust".to_string(), None).unwrap(), Tag::new("rust", 3));
}

#[test]
fn retrieve_missing_key_reports_key_and_table() {
    let database = seeded_database();
    let repo = user_repo(&database);

    let err = repo.retrieve(42, None).unwrap_err();
    assert!(err.is_not_found());
    let message = err.to_string();
    assert!(message.contains("42"));
    assert!(message.contains("users"));
}

#[test]
fn list_all_returns_every_row() {
    let database = seeded_database();
    let repo = tag_repo(&database);
    assert!(repo.list_all(None).unwrap().is_empty());

    repo.add_one(Tag::new("a", 1), None).unwrap();
    repo.add_one(Tag::new("b", 2), None).unwrap();

    let mut names = repo
        .list_all(None)
        .unwrap()
        .into_iter()
        .map(|tag| tag.name)
        .collect::<Vec<_>>();
    names.sort();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn add_many_without_return_persists_all() {
    let database = seeded_database();
    let repo = user_repo(&database);

    let returned = repo
        .add_many(vec![User::new("a"), User::new("b"), User::new("c")], false, None)
        .unwrap();
    assert!(returned.is_none());
    assert_eq!(repo.list_all(None).unwrap().len(), 3);
}

#[test]
fn add_many_with_return_yields_refreshed_objects() {
    let database = seeded_database();
    let repo = user_repo(&database);

    let stored = repo
        .add_many(vec![User::new("x"), User::new("y")], true, None)
        .unwrap()
        .unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].name, "x");
    assert_eq!(stored[1].name, "y");
    assert!(stored.iter().all(|user| user.id.is_some()));
    assert_ne!(stored[0].id, stored[1].id);

    for user in &stored {
        assert_eq!(&repo.retrieve(user.id.unwrap(), None).unwrap(), user);
    }
}

#[test]
fn add_many_empty_batch_is_a_no_op() {
    let database = seeded_database();
    let repo = tag_repo(&database);

    assert_eq!(repo.add_many(Vec::new(), true, None).unwrap(), Some(Vec::new()));
    assert!(repo.list_all(None).unwrap().is_empty());
}

#[test]
fn update_one_applies_fields_and_keeps_primary_key() {
    let database = seeded_database();
    let repo = user_repo(&database);
    let id = repo.add_one(User::new("old"), None).unwrap().id.unwrap();

    let mut values = UpdateValues::new();
    values.insert("id".to_string(), Value::Integer(id + 100));
    values.insert("name".to_string(), Value::from("new"));
    values.insert("active".to_string(), Value::Boolean(false));

    let updated = repo.update_one(id, values, None).unwrap();
    assert_eq!(updated.id, Some(id));
    assert_eq!(updated.name, "new");
    assert!(!updated.active);

    assert_eq!(repo.retrieve(id, None).unwrap(), updated);
    assert!(repo.retrieve(id + 100, None).unwrap_err().is_not_found());
}

#[test]
fn update_one_accepts_json_field_mapping() {
    let database = seeded_database();
    let repo = user_repo(&database);
    let id = repo
        .add_one(User::new("json").with_email("old@example.com"), None)
        .unwrap()
        .id
        .unwrap();

    let values: UpdateValues =
        serde_json::from_str(r#"{"name": "parsed", "email": null}"#).unwrap();
    let updated = repo.update_one(id, values, None).unwrap();
    assert_eq!(updated.name, "parsed");
    assert_eq!(updated.email, None);
}

#[test]
fn update_one_with_empty_mapping_returns_current_state() {
    let database = seeded_database();
    let repo = tag_repo(&database);
    repo.add_one(Tag::new("same", 7), None).unwrap();

    let updated = repo
        .update_one("same".to_string(), UpdateValues::new(), None)
        .unwrap();
    assert_eq!(updated, Tag::new("same", 7));
}

#[test]
fn update_one_missing_key_is_not_found() {
    let database = seeded_database();
    let repo = tag_repo(&database);

    let mut values = UpdateValues::new();
    values.insert("weight".to_string(), Value::Integer(1));
    let err = repo.update_one("ghost".to_string(), values, None).unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn update_one_unknown_field_fails_without_writing() {
    let database = seeded_database();
    let repo = tag_repo(&database);
    repo.add_one(Tag::new("keep", 1), None).unwrap();

    let mut values = UpdateValues::new();
    values.insert("weight".to_string(), Value::Integer(9));
    values.insert("colour".to_string(), Value::from("red"));
    let err = repo.update_one("keep".to_string(), values, None).unwrap_err();
    match err {
        RepoError::Mapping(MapError::UnknownField { table, field }) => {
            assert_eq!(table, "tags");
            assert_eq!(field, "colour");
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(repo.retrieve("keep".to_string(), None).unwrap().weight, 1);
}

#[test]
fn update_one_rejects_undecodable_value() {
    let database = seeded_database();
    let repo = tag_repo(&database);
    repo.add_one(Tag::new("typed", 1), None).unwrap();

    let mut values = UpdateValues::new();
    values.insert("weight".to_string(), Value::from("heavy"));
    let err = repo.update_one("typed".to_string(), values, None).unwrap_err();
    assert!(matches!(err, RepoError::Mapping(_)));
}

#[test]
fn delete_one_removes_row() {
    let database = seeded_database();
    let repo = user_repo(&database);
    let id = repo.add_one(User::new("gone"), None).unwrap().id.unwrap();

    repo.delete_one(id, None).unwrap();
    assert!(repo.retrieve(id, None).unwrap_err().is_not_found());
    assert!(repo.list_all(None).unwrap().is_empty());
}

#[test]
fn delete_one_missing_key_is_not_found() {
    let database = seeded_database();
    let repo = user_repo(&database);
    repo.add_one(User::new("stay"), None).unwrap();

    let err = repo.delete_one(999, None).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound { ref table, ref key } if table == "users" && key == "999"
    ));
    assert_eq!(repo.list_all(None).unwrap().len(), 1);
}

#[test]
fn duplicate_primary_key_surfaces_driver_error() {
    let database = seeded_database();
    let repo = tag_repo(&database);
    repo.add_one(Tag::new("dup", 1), None).unwrap();

    let err = repo.add_one(Tag::new("dup", 2), None).unwrap_err();
    assert!(matches!(err, RepoError::Db(DbError::Sqlite(_))));
    assert_eq!(repo.retrieve("dup".to_string(), None).unwrap().weight, 1);
    assert_eq!(database.open_session_count(), 0);
}

#[test]
fn failed_batch_leaves_no_partial_rows() {
    let database = seeded_database();
    let repo = tag_repo(&database);

    let err = repo
        .add_many(
            vec![Tag::new("one", 1), Tag::new("two", 2), Tag::new("one", 3)],
            false,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));
    assert!(repo.list_all(None).unwrap().is_empty());
}

static NOTES: TableDef = TableDef::new(
    "notes",
    &[
        ColumnDef::new("id", ColumnType::Integer).primary_key().generated(),
        ColumnDef::new("body", ColumnType::Text),
    ],
);

/// Model whose `to_values` omits the `body` column.
#[derive(Debug, Clone, PartialEq)]
struct Note {
    id: Option<i64>,
    body: String,
}

impl Model for Note {
    type Key = i64;

    fn table() -> &'static TableDef {
        &NOTES
    }

    fn to_values(&self) -> Vec<Value> {
        vec![self.id.into()]
    }

    fn from_record(record: &Record) -> Result<Self, MapError> {
        Ok(Self {
            id: record.get("id")?,
            body: record.get("body")?,
        })
    }

    fn set_field(&mut self, field: &str, value: Value) -> Result<(), MapError> {
        match field {
            "id" => self.id = value.decode()?,
            "body" => self.body = value.decode()?,
            other => {
                return Err(MapError::UnknownField {
                    table: NOTES.name,
                    field: other.to_string(),
                })
            }
        }
        Ok(())
    }
}

#[test]
fn model_with_missing_values_fails_instead_of_inserting() {
    let database = seeded_database();
    let repo: TableRepository<'_, Note> = TableRepository::try_new(&database).unwrap();
    database.create_tables().unwrap();

    let note = Note {
        id: None,
        body: "lost".to_string(),
    };
    let err = repo.add_one(note.clone(), None).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Mapping(MapError::ValueCount {
            table: "notes",
            expected: 2,
            found: 1
        })
    ));

    let err = repo.add_many(vec![note], true, None).unwrap_err();
    assert!(matches!(err, RepoError::Mapping(MapError::ValueCount { .. })));
    assert!(repo.list_all(None).unwrap().is_empty());
    assert_eq!(database.open_session_count(), 0);
}
