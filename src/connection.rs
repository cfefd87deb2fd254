use crate::{
    record::{Identifier, Record},
    store::RecordStore,
};

/// Database connection enum that holds different database backends
pub enum DatabaseConnection {
    /// SQLite connection
    #[cfg(feature = "sqlite")]
    SQLite(crate::runner_sqlite::SqliteStore),
    /// PostgreSQL client
    #[cfg(feature = "postgresql")]
    PostgreSQL(tokio_postgres::Client),
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Connection> for DatabaseConnection {
    fn from(conn: rusqlite::Connection) -> Self {
        DatabaseConnection::SQLite(conn.into())
    }
}

#[cfg(feature = "postgresql")]
impl From<tokio_postgres::Client> for DatabaseConnection {
    fn from(client: tokio_postgres::Client) -> Self {
        DatabaseConnection::PostgreSQL(client)
    }
}

impl RecordStore for DatabaseConnection {
    async fn select(
        &self,
        table: &str,
        columns: &[&str],
        filter: &Record,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<Record>> {
        match self {
            #[cfg(feature = "sqlite")]
            DatabaseConnection::SQLite(store) => store.select(table, columns, filter, limit).await,
            #[cfg(feature = "postgresql")]
            DatabaseConnection::PostgreSQL(client) => {
                client.select(table, columns, filter, limit).await
            }
        }
    }

    async fn insert(&self, table: &str, data: &Record) -> anyhow::Result<Identifier> {
        match self {
            #[cfg(feature = "sqlite")]
            DatabaseConnection::SQLite(store) => store.insert(table, data).await,
            #[cfg(feature = "postgresql")]
            DatabaseConnection::PostgreSQL(client) => client.insert(table, data).await,
        }
    }

    async fn update(&self, table: &str, data: &Record, filter: &Record) -> anyhow::Result<u64> {
        match self {
            #[cfg(feature = "sqlite")]
            DatabaseConnection::SQLite(store) => store.update(table, data, filter).await,
            #[cfg(feature = "postgresql")]
            DatabaseConnection::PostgreSQL(client) => client.update(table, data, filter).await,
        }
    }
}
