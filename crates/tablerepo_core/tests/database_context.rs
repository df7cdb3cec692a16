mod common;

use common::{private_database, seeded_database, tag_repo, user_repo, Tag, User, TAGS};
use tablerepo_core::{
    AddOneRepository, Backend, ColumnDef, ColumnType, ConstructionError, Database, Dialect,
    EngineOptions, MapError, RetrieveRepository, TableDef,
};

#[test]
fn malformed_urls_fail_construction() {
    assert!(matches!(
        Database::with_default_schema("not a url").unwrap_err(),
        ConstructionError::InvalidUrl(_)
    ));
    assert!(matches!(
        Database::with_default_schema("mysql://root@localhost/app").unwrap_err(),
        ConstructionError::UnsupportedBackend(ref name) if name == "mysql"
    ));
    assert!(matches!(
        Database::with_default_schema("sqlite://remote-host/app.db").unwrap_err(),
        ConstructionError::InvalidUrl(_)
    ));
}

#[test]
fn sqlite_schema_rules_are_enforced() {
    assert!(Database::new("sqlite://", "public").is_ok());
    assert!(Database::new("sqlite://", "main").is_ok());
    assert!(matches!(
        Database::new("sqlite://", "sales").unwrap_err(),
        ConstructionError::UnsupportedSchema { .. }
    ));
    assert!(matches!(
        Database::new("sqlite://", "").unwrap_err(),
        ConstructionError::InvalidSchema(_)
    ));
}

#[test]
fn metadata_reflects_registered_models() {
    let database = private_database();
    assert_eq!(database.dialect(), Dialect::Sqlite);
    assert_eq!(database.get_metadata().schema(), "public");
    assert!(database.get_metadata().tables().is_empty());

    assert!(database.get_base().register::<User>().unwrap());
    assert!(!database.get_base().register::<User>().unwrap());
    assert!(database.get_base().register::<Tag>().unwrap());

    let metadata = database.get_base().metadata();
    assert!(metadata.contains("users"));
    assert!(metadata.contains("tags"));
    assert_eq!(metadata.tables().len(), 2);
    assert_eq!(metadata.create_statements().len(), 2);
}

static CONFLICTING_TAGS: TableDef = TableDef::new(
    "tags",
    &[ColumnDef::new("label", ColumnType::Text).primary_key()],
);

static COMPOSITE: TableDef = TableDef::new(
    "memberships",
    &[
        ColumnDef::new("user_id", ColumnType::Integer).primary_key(),
        ColumnDef::new("group_id", ColumnType::Integer).primary_key(),
    ],
);

#[test]
fn invalid_or_conflicting_mappings_are_rejected() {
    let database = private_database();
    database.get_base().register_table(&TAGS).unwrap();

    assert!(matches!(
        database.get_base().register_table(&CONFLICTING_TAGS).unwrap_err(),
        MapError::TableConflict("tags")
    ));
    assert!(matches!(
        database.get_base().register_table(&COMPOSITE).unwrap_err(),
        MapError::PrimaryKey { .. }
    ));
}

#[test]
fn create_tables_is_idempotent() {
    let database = seeded_database();
    database.create_tables().unwrap();

    let repo = tag_repo(&database);
    repo.add_one(Tag::new("twice", 2), None).unwrap();
    database.create_tables().unwrap();
    assert_eq!(repo.retrieve("twice".to_string(), None).unwrap().weight, 2);
    assert_eq!(database.open_session_count(), 0);
}

#[test]
fn create_tables_with_nothing_registered_succeeds() {
    let database = private_database();
    database.create_tables().unwrap();
}

#[test]
fn in_private_databases_are_isolated() {
    let first = seeded_database();
    let second = seeded_database();

    tag_repo(&first).add_one(Tag::new("only-first", 1), None).unwrap();
    assert!(tag_repo(&second)
        .retrieve("only-first".to_string(), None)
        .unwrap_err()
        .is_not_found());
}

#[test]
fn file_database_persists_across_contexts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.db");
    let url = format!("sqlite:///{}", path.display());

    let id = {
        let database = Database::with_default_schema(&url).unwrap();
        assert!(matches!(
            database.database_url().backend(),
            Backend::SqliteFile(stored) if stored == &path
        ));
        let repo = user_repo(&database);
        database.create_tables().unwrap();
        repo.add_one(User::new("durable"), None).unwrap().id.unwrap()
    };
    assert!(path.exists());

    let reopened = Database::with_default_schema(&url).unwrap();
    let repo = user_repo(&reopened);
    reopened.create_tables().unwrap();
    assert_eq!(repo.retrieve(id, None).unwrap().name, "durable");
}

#[test]
fn custom_engine_options_are_accepted() {
    let options = EngineOptions {
        echo: true,
        foreign_keys: false,
        ..EngineOptions::default()
    };
    let database = Database::with_options("sqlite:///:memory:", "main", options).unwrap();
    let repo = tag_repo(&database);
    database.create_tables().unwrap();
    repo.add_one(Tag::new("echoed", 1), None).unwrap();
    assert_eq!(database.get_metadata().schema(), "main");
}
