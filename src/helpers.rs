//! Record helpers: short, fixed sequences of store calls.
//!
//! None of these functions open a transaction. A check followed by a write is two separate
//! round trips, so concurrent callers can interleave between them; run the helpers against
//! a transaction-bound store when that matters.

use crate::{
    record::{ID_COLUMN, Identifier, Record, from_record},
    store::RecordStore,
};
use serde::de::DeserializeOwned;

/// Insert `data` unless a row matching `filter` already exists.
///
/// Returns the generated id of the inserted row, or [`Identifier::ZERO`] when a match was
/// found and nothing was inserted. `key` narrows the column fetched by the existence check;
/// all columns are fetched when it is `None`.
pub async fn insert_if_not_exists<S: RecordStore>(
    store: &S,
    table: &str,
    data: &Record,
    filter: &Record,
    key: Option<&str>,
) -> anyhow::Result<Identifier> {
    let columns: Vec<&str> = key.into_iter().collect();
    let found = store.select(table, &columns, filter, Some(1)).await?;
    if found.is_empty() {
        return store.insert(table, data).await;
    }
    Ok(Identifier::ZERO)
}

/// Arguments of [`upsert`]
#[derive(Debug, Clone, Copy)]
pub struct UpsertProps<'a> {
    pub table: &'a str,
    pub data: &'a Record,
    pub filter: &'a Record,
    /// Fetch the written row back after the update or insert
    pub return_record: bool,
}

/// Update the first row matching `filter`, or insert when there is none.
///
/// The existing row is updated by its `id` with `data` exactly as given; filter fields are
/// not merged in, so `data` may change the very columns that were matched on. A matched row
/// whose `id` is missing or zero counts as no match.
///
/// Returns the full row when `return_record` is set (`None` if it can no longer be found),
/// otherwise `None`.
pub async fn upsert<S: RecordStore>(
    store: &S,
    props: UpsertProps<'_>,
) -> anyhow::Result<Option<Record>> {
    let UpsertProps {
        table,
        data,
        filter,
        return_record,
    } = props;

    let existing = store
        .select(table, &[ID_COLUMN], filter, Some(1))
        .await?
        .first()
        .and_then(Identifier::of_record);

    let id = match existing {
        Some(id) => {
            tracing::info!(table, id = %id, "upsert: record exists, updating");
            store.update(table, data, &id.to_filter()).await?;
            id
        }
        None => {
            tracing::info!(table, "upsert: record does not exist, inserting");
            store.insert(table, data).await?
        }
    };

    if return_record {
        return get_by_id(store, table, id).await;
    }
    Ok(None)
}

/// Legacy upsert that updates by the filter rather than by id.
///
/// Every row matching `filter` is updated with `data`, and the id of the first match is
/// returned. When nothing matches, `data` is inserted and [`Identifier::ZERO`] is returned
/// rather than the generated id; callers relying on this older behaviour expect the zero.
pub async fn upsert_by_filter<S: RecordStore>(
    store: &S,
    table: &str,
    data: &Record,
    filter: &Record,
) -> anyhow::Result<Identifier> {
    let found = store.select(table, &[], filter, None).await?;
    let Some(first) = found.first() else {
        tracing::info!(table, "upsert_by_filter: record does not exist, inserting");
        store.insert(table, data).await?;
        return Ok(Identifier::ZERO);
    };

    let id = Identifier::of_record(first).unwrap_or(Identifier::ZERO);
    tracing::info!(
        table,
        id = %id,
        matched = found.len(),
        "upsert_by_filter: record exists, updating"
    );
    store.update(table, data, filter).await?;
    Ok(id)
}

/// Fetch the row whose `id` equals `id`. A missing row is `Ok(None)`, not an error.
pub async fn get_by_id<S: RecordStore>(
    store: &S,
    table: &str,
    id: impl Into<Identifier>,
) -> anyhow::Result<Option<Record>> {
    let filter = id.into().to_filter();
    let rows = store.select(table, &[], &filter, Some(1)).await?;
    Ok(rows.into_iter().next())
}

/// [`get_by_id`] deserialized into `T`
pub async fn get_by_id_as<S: RecordStore, T: DeserializeOwned>(
    store: &S,
    table: &str,
    id: impl Into<Identifier>,
) -> anyhow::Result<Option<T>> {
    match get_by_id(store, table, id).await? {
        Some(row) => Ok(Some(from_record(row)?)),
        None => Ok(None),
    }
}

/// Insert `data`, then fetch the new row by its generated id.
///
/// The fetch result is returned as-is: if the row cannot be read back the result is
/// `Ok(None)`.
pub async fn insert_and_return<S: RecordStore>(
    store: &S,
    table: &str,
    data: &Record,
) -> anyhow::Result<Option<Record>> {
    let id = store.insert(table, data).await?;
    get_by_id(store, table, id).await
}

/// [`insert_and_return`] deserialized into `T`
pub async fn insert_and_return_as<S: RecordStore, T: DeserializeOwned>(
    store: &S,
    table: &str,
    data: &Record,
) -> anyhow::Result<Option<T>> {
    match insert_and_return(store, table, data).await? {
        Some(row) => Ok(Some(from_record(row)?)),
        None => Ok(None),
    }
}
