use crate::{
    parameters::ParameterValue,
    record::{ID_COLUMN, Identifier, Record},
    result::RecordError,
    statement::{SqlStatement, build_insert, build_select, build_update, postgres_placeholder},
    store::RecordStore,
};
use bytes::BytesMut;
use std::{borrow::Cow, fmt::Write};
use tokio_postgres::{
    Client, GenericClient, Row, Transaction,
    types::{Format, FromSql, IsNull, ToSql, Type, to_sql_checked},
};

// PostgreSQL type OIDs for all column types
const POSTGRES_TYPE_OID_BOOL: u32 = 16;
const POSTGRES_TYPE_OID_BYTEA: u32 = 17;
const POSTGRES_TYPE_OID_NAME: u32 = 19;
const POSTGRES_TYPE_OID_INT2: u32 = 21;
const POSTGRES_TYPE_OID_INT4: u32 = 23;
const POSTGRES_TYPE_OID_INT8: u32 = 20;
const POSTGRES_TYPE_OID_FLOAT4: u32 = 700;
const POSTGRES_TYPE_OID_FLOAT8: u32 = 701;
const POSTGRES_TYPE_OID_UNKNOWN: u32 = 705;
const POSTGRES_TYPE_OID_TEXT: u32 = 25;
const POSTGRES_TYPE_OID_VARCHAR: u32 = 1043;
const POSTGRES_TYPE_OID_BPCHAR: u32 = 1042;
const POSTGRES_TYPE_OID_JSON: u32 = 114;
const POSTGRES_TYPE_OID_JSONB: u32 = 3802;
const POSTGRES_TYPE_OID_DATE: u32 = 1082;
const POSTGRES_TYPE_OID_TIME: u32 = 1083;
const POSTGRES_TYPE_OID_TIMESTAMP: u32 = 1114;
const POSTGRES_TYPE_OID_TIMESTAMPTZ: u32 = 1184;
const POSTGRES_TYPE_OID_NUMERIC: u32 = 1700;
const POSTGRES_TYPE_OID_UUID: u32 = 2950;

type BoxedError = Box<dyn std::error::Error + Sync + Send>;

fn is_text_oid(oid: u32) -> bool {
    matches!(
        oid,
        POSTGRES_TYPE_OID_TEXT
            | POSTGRES_TYPE_OID_VARCHAR
            | POSTGRES_TYPE_OID_BPCHAR
            | POSTGRES_TYPE_OID_NAME
            | POSTGRES_TYPE_OID_UNKNOWN
    )
}

/// Types `to_sql` writes in binary form. Values for any other type are sent as text and
/// parsed by the server, which covers dates, timestamps, UUIDs, NUMERIC and the like.
fn has_binary_encoding(oid: u32) -> bool {
    matches!(
        oid,
        POSTGRES_TYPE_OID_BOOL
            | POSTGRES_TYPE_OID_BYTEA
            | POSTGRES_TYPE_OID_INT2
            | POSTGRES_TYPE_OID_INT4
            | POSTGRES_TYPE_OID_INT8
            | POSTGRES_TYPE_OID_FLOAT4
            | POSTGRES_TYPE_OID_FLOAT8
            | POSTGRES_TYPE_OID_JSON
            | POSTGRES_TYPE_OID_JSONB
    ) || is_text_oid(oid)
}

fn unsupported(ty: &Type, value: &ParameterValue) -> BoxedError {
    Box::new(RecordError::new_unsupported_value(
        format!("PostgreSQL type {}", ty.name()),
        value.to_string(),
    ))
}

/// Bind a record value as whatever type the server inferred for its placeholder.
///
/// Records carry JSON scalars, so an integer may land in an INT2, INT4 or INT8 column,
/// or a numeric string in an integer key column. Narrowing conversions are range checked.
impl ParameterValue {
    fn to_sql_text(&self, out: &mut BytesMut) -> IsNull {
        let text: Cow<'_, str> = match self {
            ParameterValue::Null => return IsNull::Yes,
            ParameterValue::Integer(i) => i.to_string().into(),
            ParameterValue::Float(f) => f.to_string().into(),
            ParameterValue::Boolean(b) => b.to_string().into(),
            ParameterValue::String(s) => s.as_str().into(),
            ParameterValue::Json(v) => v.to_string().into(),
        };
        out.extend_from_slice(text.as_bytes());
        IsNull::No
    }
}

impl ToSql for ParameterValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxedError> {
        let oid = ty.oid();
        if !has_binary_encoding(oid) {
            return Ok(self.to_sql_text(out));
        }
        match self {
            ParameterValue::Null => Ok(IsNull::Yes),
            ParameterValue::Integer(i) => match oid {
                POSTGRES_TYPE_OID_INT2 => i16::try_from(*i)?.to_sql(ty, out),
                POSTGRES_TYPE_OID_INT4 => i32::try_from(*i)?.to_sql(ty, out),
                POSTGRES_TYPE_OID_INT8 => i.to_sql(ty, out),
                POSTGRES_TYPE_OID_FLOAT4 => (*i as f32).to_sql(ty, out),
                POSTGRES_TYPE_OID_FLOAT8 => (*i as f64).to_sql(ty, out),
                POSTGRES_TYPE_OID_BOOL => (*i != 0).to_sql(ty, out),
                POSTGRES_TYPE_OID_JSON | POSTGRES_TYPE_OID_JSONB => {
                    serde_json::Value::from(*i).to_sql(ty, out)
                }
                oid if is_text_oid(oid) => i.to_string().to_sql(ty, out),
                _ => Err(unsupported(ty, self)),
            },
            ParameterValue::Float(f) => match oid {
                POSTGRES_TYPE_OID_FLOAT4 => (*f as f32).to_sql(ty, out),
                POSTGRES_TYPE_OID_FLOAT8 => f.to_sql(ty, out),
                POSTGRES_TYPE_OID_JSON | POSTGRES_TYPE_OID_JSONB => {
                    serde_json::Value::from(*f).to_sql(ty, out)
                }
                oid if is_text_oid(oid) => f.to_string().to_sql(ty, out),
                _ => Err(unsupported(ty, self)),
            },
            ParameterValue::Boolean(b) => match oid {
                POSTGRES_TYPE_OID_BOOL => b.to_sql(ty, out),
                POSTGRES_TYPE_OID_INT2 => (*b as i16).to_sql(ty, out),
                POSTGRES_TYPE_OID_INT4 => (*b as i32).to_sql(ty, out),
                POSTGRES_TYPE_OID_INT8 => (*b as i64).to_sql(ty, out),
                POSTGRES_TYPE_OID_JSON | POSTGRES_TYPE_OID_JSONB => {
                    serde_json::Value::from(*b).to_sql(ty, out)
                }
                oid if is_text_oid(oid) => b.to_string().to_sql(ty, out),
                _ => Err(unsupported(ty, self)),
            },
            ParameterValue::String(s) => match oid {
                POSTGRES_TYPE_OID_INT2 => s.parse::<i16>()?.to_sql(ty, out),
                POSTGRES_TYPE_OID_INT4 => s.parse::<i32>()?.to_sql(ty, out),
                POSTGRES_TYPE_OID_INT8 => s.parse::<i64>()?.to_sql(ty, out),
                POSTGRES_TYPE_OID_FLOAT4 => s.parse::<f32>()?.to_sql(ty, out),
                POSTGRES_TYPE_OID_FLOAT8 => s.parse::<f64>()?.to_sql(ty, out),
                POSTGRES_TYPE_OID_BOOL => s.parse::<bool>()?.to_sql(ty, out),
                POSTGRES_TYPE_OID_BYTEA => s.as_bytes().to_sql(ty, out),
                POSTGRES_TYPE_OID_JSON | POSTGRES_TYPE_OID_JSONB => {
                    // JSON text is sent as-is; anything else is stored as a JSON string
                    serde_json::from_str::<serde_json::Value>(s)
                        .unwrap_or_else(|_| serde_json::Value::String(s.clone()))
                        .to_sql(ty, out)
                }
                oid if is_text_oid(oid) => s.to_sql(ty, out),
                _ => Err(unsupported(ty, self)),
            },
            ParameterValue::Json(v) => match oid {
                POSTGRES_TYPE_OID_JSON | POSTGRES_TYPE_OID_JSONB => v.to_sql(ty, out),
                POSTGRES_TYPE_OID_BYTEA => json_to_bytes(v)
                    .ok_or_else(|| unsupported(ty, self))?
                    .to_sql(ty, out),
                oid if is_text_oid(oid) => v.to_string().to_sql(ty, out),
                _ => Err(unsupported(ty, self)),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // Conversion is decided per type in to_sql
        true
    }

    fn encode_format(&self, ty: &Type) -> Format {
        if has_binary_encoding(ty.oid()) {
            Format::Binary
        } else {
            Format::Text
        }
    }

    to_sql_checked!();
}

/// Arrays of byte values (the shape SQLite blobs are read back as) bind to BYTEA
fn json_to_bytes(value: &serde_json::Value) -> Option<Vec<u8>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
        .collect()
}

/// NUMERIC read as its exact decimal text
struct NumericText(String);

impl<'a> FromSql<'a> for NumericText {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxedError> {
        numeric_to_string(raw).map(NumericText)
    }

    fn accepts(ty: &Type) -> bool {
        ty.oid() == POSTGRES_TYPE_OID_NUMERIC
    }
}

/// Decode the binary NUMERIC format: a header of digit count, weight, sign and display
/// scale, followed by base-10000 digits.
fn numeric_to_string(raw: &[u8]) -> Result<String, BoxedError> {
    let word = |i: usize| -> Result<i16, BoxedError> {
        raw.get(i * 2..i * 2 + 2)
            .map(|b| i16::from_be_bytes([b[0], b[1]]))
            .ok_or_else(|| "truncated NUMERIC value".into())
    };
    let ndigits = usize::try_from(word(0)?)?;
    let weight = i32::from(word(1)?);
    let sign = word(2)? as u16;
    let dscale = word(3)? as u16 as usize;

    match sign {
        0xC000 => return Ok("NaN".to_string()),
        0xD000 => return Ok("Infinity".to_string()),
        0xF000 => return Ok("-Infinity".to_string()),
        _ => {}
    }
    let digits = (0..ndigits)
        .map(|i| word(4 + i))
        .collect::<Result<Vec<_>, _>>()?;
    let digit_at = |i: i32| -> i16 {
        usize::try_from(i)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == 0x4000 {
        out.push('-');
    }
    if weight < 0 {
        out.push('0');
    } else {
        write!(out, "{}", digit_at(0))?;
        for i in 1..=weight {
            write!(out, "{:04}", digit_at(i))?;
        }
    }
    if dscale > 0 {
        let mut fraction = String::new();
        let mut i = weight + 1;
        while fraction.len() < dscale {
            write!(fraction, "{:04}", digit_at(i))?;
            i += 1;
        }
        fraction.truncate(dscale);
        out.push('.');
        out.push_str(&fraction);
    }
    Ok(out)
}

fn to_json_value<T: serde::Serialize>(value: T) -> anyhow::Result<serde_json::Value> {
    serde_json::to_value(value).map_err(Into::into)
}

/// Convert a PostgreSQL column value based on the given type
/// This function handles the type-specific conversion to JSON using OID-based detection for stability
pub fn postgres_type_to_json_conversion(
    column_type: &Type,
    row: &Row,
    idx: usize,
) -> anyhow::Result<serde_json::Value> {
    let oid = column_type.oid();
    match oid {
        POSTGRES_TYPE_OID_BOOL => to_json_value(row.try_get::<_, Option<bool>>(idx)?),
        POSTGRES_TYPE_OID_INT2 => to_json_value(row.try_get::<_, Option<i16>>(idx)?),
        POSTGRES_TYPE_OID_INT4 => to_json_value(row.try_get::<_, Option<i32>>(idx)?),
        POSTGRES_TYPE_OID_INT8 => to_json_value(row.try_get::<_, Option<i64>>(idx)?),
        POSTGRES_TYPE_OID_FLOAT4 => to_json_value(row.try_get::<_, Option<f32>>(idx)?),
        POSTGRES_TYPE_OID_FLOAT8 => to_json_value(row.try_get::<_, Option<f64>>(idx)?),
        POSTGRES_TYPE_OID_TEXT
        | POSTGRES_TYPE_OID_VARCHAR
        | POSTGRES_TYPE_OID_BPCHAR
        | POSTGRES_TYPE_OID_NAME => to_json_value(row.try_get::<_, Option<String>>(idx)?),
        POSTGRES_TYPE_OID_BYTEA => to_json_value(row.try_get::<_, Option<Vec<u8>>>(idx)?),
        POSTGRES_TYPE_OID_JSON | POSTGRES_TYPE_OID_JSONB => {
            to_json_value(row.try_get::<_, Option<serde_json::Value>>(idx)?)
        }
        // Dates and times as ISO 8601 text, NUMERIC as exact decimal text
        POSTGRES_TYPE_OID_DATE => to_json_value(
            row.try_get::<_, Option<chrono::NaiveDate>>(idx)?
                .map(|d| d.to_string()),
        ),
        POSTGRES_TYPE_OID_TIME => to_json_value(
            row.try_get::<_, Option<chrono::NaiveTime>>(idx)?
                .map(|t| t.to_string()),
        ),
        POSTGRES_TYPE_OID_TIMESTAMP => to_json_value(
            row.try_get::<_, Option<chrono::NaiveDateTime>>(idx)?
                .map(|t| t.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        ),
        POSTGRES_TYPE_OID_TIMESTAMPTZ => to_json_value(
            row.try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)?
                .map(|t| t.to_rfc3339()),
        ),
        POSTGRES_TYPE_OID_UUID => to_json_value(
            row.try_get::<_, Option<uuid::Uuid>>(idx)?
                .map(|u| u.to_string()),
        ),
        POSTGRES_TYPE_OID_NUMERIC => to_json_value(
            row.try_get::<_, Option<NumericText>>(idx)?
                .map(|n| n.0),
        ),
        _ => Err(RecordError::UnsupportedColumnType {
            column: row.columns()[idx].name().to_string(),
            type_name: column_type.name().to_string(),
        }
        .into()),
    }
}

/// Convert a single PostgreSQL row to a record with every column it carries
pub fn row_to_record(row: &Row) -> anyhow::Result<Record> {
    let mut obj = Record::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = postgres_type_to_json_conversion(column.type_(), row, idx)?;
        obj.insert(column.name().to_string(), value);
    }
    Ok(obj)
}

fn bind_params(statement: &SqlStatement) -> Vec<&(dyn ToSql + Sync)> {
    statement
        .params
        .iter()
        .map(|param| param as &(dyn ToSql + Sync))
        .collect()
}

async fn select_rows<C: GenericClient + Sync>(
    client: &C,
    table: &str,
    columns: &[&str],
    filter: &Record,
    limit: Option<usize>,
) -> anyhow::Result<Vec<Record>> {
    let statement = build_select(table, columns, filter, limit, &postgres_placeholder)?;
    tracing::debug!(sql = %statement.sql, "postgresql select");
    let params = bind_params(&statement);
    let rows = client.query(statement.sql.as_str(), &params).await?;
    rows.iter().map(row_to_record).collect()
}

async fn insert_row<C: GenericClient + Sync>(
    client: &C,
    table: &str,
    data: &Record,
) -> anyhow::Result<Identifier> {
    let statement = build_insert(table, data, Some(ID_COLUMN), &postgres_placeholder)?;
    tracing::debug!(sql = %statement.sql, "postgresql insert");
    let params = bind_params(&statement);
    let rows = client.query(statement.sql.as_str(), &params).await?;

    let generated = match rows.first() {
        Some(row) => Identifier::from_value(&postgres_type_to_json_conversion(
            row.columns()[0].type_(),
            row,
            0,
        )?),
        None => None,
    };
    generated.ok_or_else(|| RecordError::MissingIdentifier(table.to_string()).into())
}

async fn update_rows<C: GenericClient + Sync>(
    client: &C,
    table: &str,
    data: &Record,
    filter: &Record,
) -> anyhow::Result<u64> {
    let statement = build_update(table, data, filter, &postgres_placeholder)?;
    tracing::debug!(sql = %statement.sql, "postgresql update");
    let params = bind_params(&statement);
    let affected = client.execute(statement.sql.as_str(), &params).await?;
    Ok(affected)
}

impl RecordStore for Client {
    async fn select(
        &self,
        table: &str,
        columns: &[&str],
        filter: &Record,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<Record>> {
        select_rows(self, table, columns, filter, limit).await
    }

    async fn insert(&self, table: &str, data: &Record) -> anyhow::Result<Identifier> {
        insert_row(self, table, data).await
    }

    async fn update(&self, table: &str, data: &Record, filter: &Record) -> anyhow::Result<u64> {
        update_rows(self, table, data, filter).await
    }
}

/// Running the helpers against a transaction leaves begin/commit/rollback to the caller,
/// which is how a caller makes a check-then-write sequence atomic.
impl RecordStore for Transaction<'_> {
    async fn select(
        &self,
        table: &str,
        columns: &[&str],
        filter: &Record,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<Record>> {
        select_rows(self, table, columns, filter, limit).await
    }

    async fn insert(&self, table: &str, data: &Record) -> anyhow::Result<Identifier> {
        insert_row(self, table, data).await
    }

    async fn update(&self, table: &str, data: &Record, filter: &Record) -> anyhow::Result<u64> {
        update_rows(self, table, data, filter).await
    }
}
