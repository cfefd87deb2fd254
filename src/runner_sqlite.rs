use crate::{
    parameters::ParameterValue,
    record::{Identifier, Record},
    statement::{SqlStatement, build_insert, build_select, build_update, sqlite_placeholder},
    store::RecordStore,
};
use rusqlite::{Connection, types::ValueRef};
use std::sync::{Mutex, MutexGuard};

// Implement trait for converting generic ParameterValue to SQLite-specific ToSql
impl From<ParameterValue> for Box<dyn rusqlite::ToSql> {
    fn from(param_value: ParameterValue) -> Self {
        match param_value {
            ParameterValue::Null => Box::new(rusqlite::types::Null),
            ParameterValue::String(s) => Box::new(s),
            ParameterValue::Integer(i) => Box::new(i),
            ParameterValue::Float(f) => Box::new(f),
            ParameterValue::Boolean(b) => Box::new(b as i32), // SQLite represents booleans as integers
            ParameterValue::Json(v) => Box::new(v.to_string()),
        }
    }
}

fn bind_params(statement: &SqlStatement) -> Vec<Box<dyn rusqlite::ToSql>> {
    statement.params.iter().cloned().map(Into::into).collect()
}

/// Convert a SQLite column value to JSON. Blobs become arrays of byte values.
fn value_ref_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Integer(i) => serde_json::Value::Number(i.into()),
        ValueRef::Real(r) => serde_json::Value::from(r),
        ValueRef::Text(s) => serde_json::Value::String(String::from_utf8_lossy(s).to_string()),
        ValueRef::Blob(b) => serde_json::Value::Array(
            b.iter()
                .map(|&byte| serde_json::Value::Number(byte.into()))
                .collect(),
        ),
        ValueRef::Null => serde_json::Value::Null,
    }
}

fn select_rows(conn: &Connection, statement: &SqlStatement) -> anyhow::Result<Vec<Record>> {
    let mut stmt = conn.prepare(&statement.sql)?;

    // Get column names from the prepared statement
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let params = bind_params(statement);
    let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), |row| {
        let mut obj = Record::new();
        for (idx, name) in column_names.iter().enumerate() {
            obj.insert(name.clone(), value_ref_to_json(row.get_ref(idx)?));
        }
        Ok(obj)
    })?;
    let result = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(result)
}

fn execute_statement(conn: &Connection, statement: &SqlStatement) -> anyhow::Result<usize> {
    let params = bind_params(statement);
    let mut stmt = conn.prepare(&statement.sql)?;
    let affected = stmt.execute(rusqlite::params_from_iter(params.iter()))?;
    Ok(affected)
}

/// `RecordStore` over a single rusqlite connection.
///
/// Statements run in autocommit mode; the mutex only serializes access to the
/// connection for one statement at a time.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        SqliteStore {
            conn: Mutex::new(conn),
        }
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    /// Run `f` against the underlying connection, e.g. for schema setup.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> anyhow::Result<T> {
        let conn = self.lock()?;
        Ok(f(&conn)?)
    }

    pub fn into_inner(self) -> anyhow::Result<Connection> {
        self.conn
            .into_inner()
            .map_err(|_| anyhow::anyhow!("SQLite connection mutex poisoned"))
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("SQLite connection mutex poisoned"))
    }
}

impl From<Connection> for SqliteStore {
    fn from(conn: Connection) -> Self {
        SqliteStore::new(conn)
    }
}

impl RecordStore for SqliteStore {
    async fn select(
        &self,
        table: &str,
        columns: &[&str],
        filter: &Record,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<Record>> {
        let statement = build_select(table, columns, filter, limit, &sqlite_placeholder)?;
        tracing::debug!(sql = %statement.sql, "sqlite select");
        let conn = self.lock()?;
        select_rows(&conn, &statement)
    }

    async fn insert(&self, table: &str, data: &Record) -> anyhow::Result<Identifier> {
        let statement = build_insert(table, data, None, &sqlite_placeholder)?;
        tracing::debug!(sql = %statement.sql, "sqlite insert");
        let conn = self.lock()?;
        execute_statement(&conn, &statement)?;
        // Read under the same lock so no other insert on this connection can interleave
        Ok(Identifier::Integer(conn.last_insert_rowid()))
    }

    async fn update(&self, table: &str, data: &Record, filter: &Record) -> anyhow::Result<u64> {
        let statement = build_update(table, data, filter, &sqlite_placeholder)?;
        tracing::debug!(sql = %statement.sql, "sqlite update");
        let conn = self.lock()?;
        let affected = execute_statement(&conn, &statement)?;
        Ok(affected as u64)
    }
}
