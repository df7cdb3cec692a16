//! Units of work over one driver connection.
//!
//! # Responsibility
//! - Open driver connections for a `Database` (the session factory).
//! - Translate model-level reads/writes into SQL for the active dialect.
//! - Track transaction state so `close` can discard uncommitted work.
//!
//! # Invariants
//! - A transaction begins lazily at the first write and ends at
//!   `commit`/`rollback`/`close`.
//! - `close` is idempotent and always releases the connection, even when
//!   the rollback it issues fails.
//! - Dropping an open session closes it.
//! - `open_sessions` counts sessions between open and close exactly once.
//! - A private SQLite database (`sqlite://`) is an ordinary file in a
//!   temporary directory owned by the factory, so sessions on it lock the
//!   same way they do on a file database.

use super::options::EngineOptions;
use super::url::{Backend, DatabaseUrl};
use super::{DbError, DbResult};
use crate::mapper::{Dialect, MapError, Model, Record, TableDef, Value};
use log::{debug, warn};
use rusqlite::types::Value as SqliteValue;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Settings every session of one factory shares.
#[derive(Debug)]
struct SessionSettings {
    dialect: Dialect,
    schema: Option<String>,
    echo: bool,
    open_sessions: AtomicUsize,
}

#[derive(Debug)]
enum Engine {
    Sqlite {
        target: String,
        options: EngineOptions,
    },
    #[cfg(feature = "postgres")]
    Postgres(Box<postgres::Config>),
}

/// Opens sessions for one `Database`.
///
/// Safe to share between threads; every `open` produces an independent
/// connection.
#[derive(Debug)]
pub(crate) struct SessionFactory {
    engine: Engine,
    settings: Arc<SessionSettings>,
    next_session_id: AtomicU64,
    // Removed on drop, taking the private database with it.
    _private_dir: Option<TempDir>,
}

impl SessionFactory {
    pub(crate) fn new(
        url: &DatabaseUrl,
        schema: Option<String>,
        options: &EngineOptions,
    ) -> DbResult<Self> {
        let (engine, private_dir) = match url.backend() {
            Backend::SqlitePrivate => {
                let dir = tempfile::Builder::new()
                    .prefix("tablerepo-")
                    .tempdir()
                    .map_err(DbError::Storage)?;
                let target = sqlite_file_target(&dir.path().join(PRIVATE_DB_FILE));
                // Create the file now so a bad temp dir fails construction.
                open_sqlite(&target, options)?;
                (
                    Engine::Sqlite {
                        target,
                        options: options.clone(),
                    },
                    Some(dir),
                )
            }
            Backend::SqliteFile(path) => (
                Engine::Sqlite {
                    target: sqlite_file_target(path),
                    options: options.clone(),
                },
                None,
            ),
            #[cfg(feature = "postgres")]
            Backend::Postgres(config) => {
                let mut config = config.clone();
                if let Some(timeout) = options.connect_timeout {
                    config.connect_timeout(timeout);
                }
                (Engine::Postgres(config), None)
            }
        };

        Ok(Self {
            engine,
            settings: Arc::new(SessionSettings {
                dialect: url.dialect(),
                schema,
                echo: options.echo,
                open_sessions: AtomicUsize::new(0),
            }),
            next_session_id: AtomicU64::new(1),
            _private_dir: private_dir,
        })
    }

    /// Opens a new, independent session.
    pub(crate) fn open(&self) -> DbResult<Session> {
        let handle = match &self.engine {
            Engine::Sqlite { target, options } => Handle::Sqlite(open_sqlite(target, options)?),
            #[cfg(feature = "postgres")]
            Engine::Postgres(config) => Handle::Postgres(config.connect(postgres::NoTls)?),
        };

        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let open = self.settings.open_sessions.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            "event=session_open module=session status=ok session_id={} backend={} open_sessions={}",
            id,
            self.settings.dialect.name(),
            open
        );

        Ok(Session {
            id,
            handle: Some(handle),
            in_transaction: false,
            settings: Arc::clone(&self.settings),
        })
    }

    pub(crate) fn open_sessions(&self) -> usize {
        self.settings.open_sessions.load(Ordering::SeqCst)
    }
}

const PRIVATE_DB_FILE: &str = "private.db";

fn sqlite_file_target(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn open_sqlite(target: &str, options: &EngineOptions) -> DbResult<Connection> {
    let conn = Connection::open(target)?;
    conn.busy_timeout(options.busy_timeout)?;
    if options.foreign_keys {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    } else {
        conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
    }
    Ok(conn)
}

enum Handle {
    Sqlite(Connection),
    #[cfg(feature = "postgres")]
    Postgres(postgres::Client),
}

impl Handle {
    fn batch(&mut self, sql: &str) -> DbResult<()> {
        match self {
            Self::Sqlite(conn) => conn.execute_batch(sql)?,
            #[cfg(feature = "postgres")]
            Self::Postgres(client) => client.batch_execute(sql)?,
        }
        Ok(())
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> DbResult<usize> {
        match self {
            Self::Sqlite(conn) => Ok(conn.execute(sql, params_from_iter(params.iter()))?),
            #[cfg(feature = "postgres")]
            Self::Postgres(client) => {
                let changed = client.execute(sql, &pg::params(params))?;
                Ok(usize::try_from(changed).unwrap_or(usize::MAX))
            }
        }
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> DbResult<Vec<Vec<Value>>> {
        match self {
            Self::Sqlite(conn) => {
                let mut stmt = conn.prepare(sql)?;
                let width = stmt.column_count();
                let mut rows = stmt.query(params_from_iter(params.iter()))?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    let mut values = Vec::with_capacity(width);
                    for index in 0..width {
                        values.push(Value::from(row.get::<_, SqliteValue>(index)?));
                    }
                    out.push(values);
                }
                Ok(out)
            }
            #[cfg(feature = "postgres")]
            Self::Postgres(client) => client
                .query(sql, &pg::params(params))?
                .iter()
                .map(pg::row_values)
                .collect(),
        }
    }

    fn close(self) -> DbResult<()> {
        match self {
            Self::Sqlite(conn) => conn.close().map_err(|(_conn, err)| DbError::Sqlite(err)),
            #[cfg(feature = "postgres")]
            Self::Postgres(client) => Ok(client.close()?),
        }
    }
}

#[cfg(feature = "postgres")]
mod pg {
    use super::{DbResult, MapError, Value};
    use postgres::types::{ToSql, Type};
    use postgres::Row;

    pub(super) fn params(values: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
        values
            .iter()
            .map(|value| value as &(dyn ToSql + Sync))
            .collect()
    }

    pub(super) fn row_values(row: &Row) -> DbResult<Vec<Value>> {
        let mut values = Vec::with_capacity(row.len());
        for (index, column) in row.columns().iter().enumerate() {
            let value = match *column.type_() {
                Type::BOOL => row.try_get::<_, Option<bool>>(index)?.map(Value::Boolean),
                Type::INT2 => row
                    .try_get::<_, Option<i16>>(index)?
                    .map(|v| Value::Integer(i64::from(v))),
                Type::INT4 => row
                    .try_get::<_, Option<i32>>(index)?
                    .map(|v| Value::Integer(i64::from(v))),
                Type::INT8 => row.try_get::<_, Option<i64>>(index)?.map(Value::Integer),
                Type::FLOAT4 => row
                    .try_get::<_, Option<f32>>(index)?
                    .map(|v| Value::Real(f64::from(v))),
                Type::FLOAT8 => row.try_get::<_, Option<f64>>(index)?.map(Value::Real),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
                    row.try_get::<_, Option<String>>(index)?.map(Value::Text)
                }
                Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(index)?.map(Value::Blob),
                _ => {
                    return Err(MapError::TypeMismatch {
                        expected: "bool, integer, float, text or bytea column",
                        found: "unsupported postgres column type",
                    }
                    .into())
                }
            };
            values.push(value.unwrap_or(Value::Null));
        }
        Ok(values)
    }
}

/// A short-lived unit of work.
///
/// Exactly one owner closes a session: the caller for sessions it opened
/// via `Database::session`, the scope for `Database::get_database_session`.
pub struct Session {
    id: u64,
    handle: Option<Handle>,
    in_transaction: bool,
    settings: Arc<SessionSettings>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .field("in_transaction", &self.in_transaction)
            .finish()
    }
}

impl Session {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Whether uncommitted writes are pending.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    pub fn dialect(&self) -> Dialect {
        self.settings.dialect
    }

    /// Loads the row with primary key `key`.
    pub fn get<M: Model>(&mut self, key: impl Into<Value>) -> DbResult<Option<M>> {
        match self.fetch_record(M::table(), key.into())? {
            Some(record) => Ok(Some(M::from_record(&record)?)),
            None => Ok(None),
        }
    }

    /// Loads every row of `M`'s table in storage order.
    pub fn scan<M: Model>(&mut self) -> DbResult<Vec<M>> {
        let table = M::table();
        let sql = format!(
            "SELECT {} FROM {}",
            self.select_list(table),
            self.table_name(table)
        );
        let rows = self.query_rows(&sql, &[])?;
        rows.into_iter()
            .map(|values| M::from_record(&Record::new(table, values)).map_err(DbError::from))
            .collect()
    }

    /// Inserts `obj` and writes a storage-generated key back into it.
    pub fn add<M: Model>(&mut self, obj: &mut M) -> DbResult<()> {
        let table = M::table();
        let pk = table.primary_key()?;
        let dialect = self.dialect();

        let mut columns = Vec::new();
        let mut params = Vec::new();
        for (column, value) in table.columns.iter().zip(obj.column_values()?) {
            if column.generated && value.is_null() {
                continue;
            }
            columns.push(dialect.quote(column.name));
            params.push(value);
        }

        let target = self.table_name(table);
        let returning = dialect.quote(pk.name);
        let sql = if columns.is_empty() {
            format!("INSERT INTO {target} DEFAULT VALUES RETURNING {returning}")
        } else {
            let placeholders = (1..=params.len())
                .map(|index| dialect.placeholder(index))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "INSERT INTO {target} ({}) VALUES ({placeholders}) RETURNING {returning}",
                columns.join(", ")
            )
        };

        self.begin_write()?;
        let rows = self.query_rows(&sql, &params)?;
        if let Some(key) = rows.into_iter().next().and_then(|row| row.into_iter().next()) {
            obj.set_field(pk.name, key)?;
        }
        Ok(())
    }

    /// Inserts every object within the current unit of work.
    pub fn add_all<M: Model>(&mut self, objects: &mut [M]) -> DbResult<()> {
        for obj in objects.iter_mut() {
            self.add(obj)?;
        }
        Ok(())
    }

    /// Writes the named columns of `obj` to its row.
    ///
    /// Returns the number of rows changed.
    pub fn update_columns<M: Model>(&mut self, obj: &M, columns: &[&str]) -> DbResult<usize> {
        let table = M::table();
        if columns.is_empty() {
            return Ok(0);
        }
        let pk = table.primary_key()?;
        let dialect = self.dialect();
        let values = obj.column_values()?;

        let mut assignments = Vec::with_capacity(columns.len());
        let mut params = Vec::with_capacity(columns.len() + 1);
        for name in columns {
            let index = table
                .column_index(name)
                .ok_or_else(|| MapError::UnknownField {
                    table: table.name,
                    field: (*name).to_string(),
                })?;
            params.push(values[index].clone());
            assignments.push(format!(
                "{} = {}",
                dialect.quote(name),
                dialect.placeholder(params.len())
            ));
        }
        let key = self.key_of(obj)?;
        params.push(key);

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = {}",
            self.table_name(table),
            assignments.join(", "),
            dialect.quote(pk.name),
            dialect.placeholder(params.len())
        );
        self.begin_write()?;
        self.execute(&sql, &params)
    }

    /// Deletes the row with primary key `key`, returning rows removed.
    pub fn delete<M: Model>(&mut self, key: impl Into<Value>) -> DbResult<usize> {
        let table = M::table();
        let pk = table.primary_key()?;
        let dialect = self.dialect();
        let sql = format!(
            "DELETE FROM {} WHERE {} = {}",
            self.table_name(table),
            dialect.quote(pk.name),
            dialect.placeholder(1)
        );
        self.begin_write()?;
        self.execute(&sql, &[key.into()])
    }

    /// Reloads every field of `obj` from storage.
    ///
    /// # Errors
    /// - `DbError::RowMissing` when the row no longer exists.
    pub fn refresh<M: Model>(&mut self, obj: &mut M) -> DbResult<()> {
        let table = M::table();
        let key = self.key_of(obj)?;
        match self.fetch_record(table, key.clone())? {
            Some(record) => {
                *obj = M::from_record(&record)?;
                Ok(())
            }
            None => Err(DbError::RowMissing {
                table: table.name.to_string(),
                key: key.to_string(),
            }),
        }
    }

    /// Commits pending writes; a no-op when nothing was written.
    pub fn commit(&mut self) -> DbResult<()> {
        self.end_transaction("COMMIT")
    }

    /// Discards pending writes.
    pub fn rollback(&mut self) -> DbResult<()> {
        self.end_transaction("ROLLBACK")
    }

    /// Rolls back pending writes and releases the connection.
    pub fn close(&mut self) -> DbResult<()> {
        let Some(mut handle) = self.handle.take() else {
            return Ok(());
        };

        let rolled_back = if self.in_transaction {
            self.in_transaction = false;
            handle.batch("ROLLBACK")
        } else {
            Ok(())
        };
        let released = handle.close();
        let open = self
            .settings
            .open_sessions
            .fetch_sub(1, Ordering::SeqCst)
            .saturating_sub(1);

        match (&rolled_back, &released) {
            (Ok(()), Ok(())) => debug!(
                "event=session_close module=session status=ok session_id={} open_sessions={}",
                self.id, open
            ),
            (Err(err), _) | (_, Err(err)) => warn!(
                "event=session_close module=session status=error session_id={} open_sessions={} error={}",
                self.id, open, err
            ),
        }
        rolled_back.and(released)
    }

    /// Runs schema statements inside the current unit of work.
    pub(crate) fn execute_ddl(&mut self, statements: &[String]) -> DbResult<()> {
        if statements.is_empty() {
            return Ok(());
        }
        self.begin_write()?;
        for statement in statements {
            self.run_batch(statement)?;
        }
        Ok(())
    }

    fn end_transaction(&mut self, statement: &str) -> DbResult<()> {
        if self.handle.is_none() {
            return Err(DbError::SessionClosed);
        }
        if !self.in_transaction {
            return Ok(());
        }
        self.run_batch(statement)?;
        self.in_transaction = false;
        Ok(())
    }

    fn begin_write(&mut self) -> DbResult<()> {
        if !self.in_transaction {
            self.run_batch("BEGIN")?;
            self.in_transaction = true;
        }
        Ok(())
    }

    fn fetch_record(&mut self, table: &'static TableDef, key: Value) -> DbResult<Option<Record>> {
        let pk = table.primary_key()?;
        let dialect = self.dialect();
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = {}",
            self.select_list(table),
            self.table_name(table),
            dialect.quote(pk.name),
            dialect.placeholder(1)
        );
        let rows = self.query_rows(&sql, &[key])?;
        Ok(rows
            .into_iter()
            .next()
            .map(|values| Record::new(table, values)))
    }

    fn key_of<M: Model>(&self, obj: &M) -> DbResult<Value> {
        let key = obj.primary_key_value()?;
        if key.is_null() {
            return Err(MapError::MissingPrimaryKey {
                table: M::table().name,
            }
            .into());
        }
        Ok(key)
    }

    fn table_name(&self, table: &TableDef) -> String {
        self.settings
            .dialect
            .qualified_table(self.settings.schema.as_deref(), table.name)
    }

    fn select_list(&self, table: &TableDef) -> String {
        table
            .columns
            .iter()
            .map(|column| self.settings.dialect.quote(column.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn echo(&self, sql: &str) {
        if self.settings.echo {
            debug!(
                "event=sql module=session session_id={} sql={}",
                self.id, sql
            );
        }
    }

    fn handle(&mut self) -> DbResult<&mut Handle> {
        self.handle.as_mut().ok_or(DbError::SessionClosed)
    }

    fn run_batch(&mut self, sql: &str) -> DbResult<()> {
        self.echo(sql);
        self.handle()?.batch(sql)
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> DbResult<usize> {
        self.echo(sql);
        self.handle()?.execute(sql, params)
    }

    fn query_rows(&mut self, sql: &str, params: &[Value]) -> DbResult<Vec<Vec<Value>>> {
        self.echo(sql);
        self.handle()?.query(sql, params)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(
                "event=session_drop module=session status=error session_id={} error={}",
                self.id, err
            );
        }
    }
}
