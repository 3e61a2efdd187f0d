//! Catalog persistence seam.
//!
//! The orchestrator only talks to the catalog table through these traits, so
//! Postgres and the in-memory store are interchangeable.

use std::ops::Range;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use shelfsync_core::{ProductRecord, RecordShape};

use crate::error::StoreError;

/// Opens transactions against the catalog table.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Begin a transaction. Implementations may also take an exclusive lock
    /// that is held until commit or drop.
    async fn begin(&self) -> Result<Box<dyn CatalogTx>, StoreError>;
}

/// One open catalog transaction. Dropping without [`commit`](CatalogTx::commit)
/// rolls back every change made through it.
#[async_trait]
pub trait CatalogTx: Send {
    /// Remove every row and reset the identity sequence.
    async fn truncate_and_reset(&mut self) -> Result<(), StoreError>;

    /// Insert records in order, stamping each with `ingested_at`. Records
    /// whose `(sku, source)` already exists are skipped. Returns rows written.
    async fn bulk_insert(
        &mut self,
        records: &[ProductRecord],
        shape: RecordShape,
        ingested_at: NaiveDateTime,
    ) -> Result<u64, StoreError>;

    /// Count rows created on `date` with a creation hour inside `hours`.
    async fn count_matching(&mut self, date: NaiveDate, hours: Range<u32>) -> Result<u64, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
