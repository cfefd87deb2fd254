use crate::record::{Identifier, Record};
use std::future::Future;

/// Capability surface the record helpers need from a database client.
///
/// Implementations issue exactly one statement per call and add no transaction of their
/// own, so a sequence of calls is only atomic when the caller runs it inside a transaction
/// the implementation is bound to.
pub trait RecordStore {
    /// Select `columns` (all columns when empty) from rows of `table` matching every field
    /// of `filter`, returning at most `limit` rows.
    fn select(
        &self,
        table: &str,
        columns: &[&str],
        filter: &Record,
        limit: Option<usize>,
    ) -> impl Future<Output = anyhow::Result<Vec<Record>>> + Send;

    /// Insert `data` into `table` and return the generated identifier.
    fn insert(
        &self,
        table: &str,
        data: &Record,
    ) -> impl Future<Output = anyhow::Result<Identifier>> + Send;

    /// Update every row of `table` matching `filter` with `data`, returning the number of
    /// rows affected.
    fn update(
        &self,
        table: &str,
        data: &Record,
        filter: &Record,
    ) -> impl Future<Output = anyhow::Result<u64>> + Send;
}
