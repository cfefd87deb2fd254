use crate::result::{RecordError, Result};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;

/// A row, or a subset of a row: column name to scalar value.
///
/// Where-clauses use the same shape; every field is an equality match and all of
/// them are ANDed together.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Name of the primary key column every table is expected to carry.
pub const ID_COLUMN: &str = "id";

/// Primary key value of a row, relative to its table's `id` column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Integer(i64),
    Text(String),
}

impl Identifier {
    /// Sentinel returned when no row was inserted.
    pub const ZERO: Identifier = Identifier::Integer(0);

    /// True for the sentinel zero, and for an empty text key which is treated the same way
    /// when deciding whether a looked-up row carries a usable id.
    pub fn is_sentinel(&self) -> bool {
        match self {
            Identifier::Integer(i) => *i == 0,
            Identifier::Text(s) => s.is_empty(),
        }
    }

    /// Read an identifier out of a JSON value. Floats with no fractional part are
    /// accepted since some drivers report integer keys that way.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_i64().map(Identifier::Integer).or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| Identifier::Integer(f as i64))
            }),
            serde_json::Value::String(s) => Some(Identifier::Text(s.clone())),
            _ => None,
        }
    }

    /// The `id` of a record, if present and not the sentinel.
    pub fn of_record(record: &Record) -> Option<Self> {
        record
            .get(ID_COLUMN)
            .and_then(Identifier::from_value)
            .filter(|id| !id.is_sentinel())
    }

    pub fn to_value(&self) -> serde_json::Value {
        match self {
            Identifier::Integer(i) => serde_json::Value::from(*i),
            Identifier::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Single-field where-clause `{"id": self}`.
    pub fn to_filter(&self) -> Record {
        let mut filter = Record::new();
        filter.insert(ID_COLUMN.to_string(), self.to_value());
        filter
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Integer(i) => write!(f, "{i}"),
            Identifier::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Identifier {
    fn from(value: i64) -> Self {
        Identifier::Integer(value)
    }
}

impl From<i32> for Identifier {
    fn from(value: i32) -> Self {
        Identifier::Integer(value.into())
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::Text(value.to_string())
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Identifier::Text(value)
    }
}

impl From<&Identifier> for Identifier {
    fn from(value: &Identifier) -> Self {
        value.clone()
    }
}

/// Serialize a typed row into a record. Anything that does not serialize to a JSON
/// object is rejected.
pub fn to_record<T: Serialize>(value: &T) -> Result<Record> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(RecordError::new_unsupported_value(
            "record",
            format!("expected an object, got {other}"),
        )),
    }
}

/// Deserialize a fetched record into a typed row.
pub fn from_record<T: DeserializeOwned>(record: Record) -> Result<T> {
    Ok(serde_json::from_value(serde_json::Value::Object(record))?)
}
