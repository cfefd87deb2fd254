use thiserror::Error;

/// Errors raised by the record helpers themselves.
///
/// Driver errors (`rusqlite::Error`, `tokio_postgres::Error`) are never wrapped in this
/// type; they travel through `anyhow::Error` unchanged so callers can downcast them.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("Update on table {0} has no columns to set")]
    EmptyUpdate(String),
    #[error("Insert into table {0} did not yield an id")]
    MissingIdentifier(String),
    #[error("Unsupported value for {target}: {got}")]
    UnsupportedValue { target: String, got: String },
    #[error("Column {column} has unsupported type {type_name}")]
    UnsupportedColumnType { column: String, type_name: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RecordError {
    pub fn new_invalid_identifier(name: impl Into<String>) -> Self {
        RecordError::InvalidIdentifier(name.into())
    }

    pub fn new_unsupported_value(target: impl Into<String>, got: impl Into<String>) -> Self {
        RecordError::UnsupportedValue {
            target: target.into(),
            got: got.into(),
        }
    }
}

/// Type alias for Results using RecordError
pub type Result<T> = std::result::Result<T, RecordError>;
