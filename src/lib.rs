#[cfg(any(feature = "sqlite", feature = "postgresql"))]
pub mod connection;
pub mod helpers;
pub mod parameters;
pub mod record;
pub mod result;
#[cfg(feature = "postgresql")]
pub mod runner_postgresql;
#[cfg(feature = "sqlite")]
pub mod runner_sqlite;
pub mod statement;
pub mod store;
pub mod str_utils;

// Re-export types for convenience
#[cfg(any(feature = "sqlite", feature = "postgresql"))]
pub use connection::DatabaseConnection;
pub use helpers::{
    UpsertProps, get_by_id, get_by_id_as, insert_and_return, insert_and_return_as,
    insert_if_not_exists, upsert, upsert_by_filter,
};
pub use parameters::ParameterValue;
pub use record::{ID_COLUMN, Identifier, Record, from_record, to_record};
pub use result::{RecordError, Result};
#[cfg(feature = "sqlite")]
pub use runner_sqlite::SqliteStore;
pub use store::RecordStore;

// Re-export third-party types used in the public API to provide fallback for dependency conflicts
pub use serde_json::Value as JsonValue;

// Re-export third-party types used in the public API to provide fallback for dependency conflicts
#[cfg(feature = "sqlite")]
pub use rusqlite::Connection as SqliteConnection;

#[cfg(feature = "postgresql")]
pub use tokio_postgres::Client as PostgresClient;
