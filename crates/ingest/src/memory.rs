//! In-memory catalog store.
//!
//! Follows the Postgres table's semantics: `UNIQUE (sku, source)` where a
//! NULL in either column never conflicts, an identity that restarts on
//! truncate, and transactions that only become visible on commit.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Timelike};

use shelfsync_core::{ProductRecord, RecordShape};
use shelfsync_storage::Connectivity;

use crate::error::StoreError;
use crate::store::{CatalogStore, CatalogTx};

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRow {
    pub id: i64,
    pub record: ProductRecord,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default)]
struct Table {
    rows: Vec<CatalogRow>,
    next_id: i64,
}

impl Table {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
struct Shared {
    table: Mutex<Table>,
    fail_inserts: AtomicBool,
    unavailable: AtomicBool,
}

/// Cloning shares the underlying table.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalogStore {
    shared: Arc<Shared>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed rows in id order.
    pub fn rows(&self) -> Vec<CatalogRow> {
        self.lock().rows.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every subsequent `bulk_insert` fail with a query error.
    pub fn fail_inserts(&self, fail: bool) {
        self.shared.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Make `begin` fail as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.shared.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Table> {
        self.shared.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn begin(&self) -> Result<Box<dyn CatalogTx>, StoreError> {
        if self.shared.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                kind: Connectivity::Refused,
                message: "connection refused".to_string(),
            });
        }
        let working = self.lock().clone();
        Ok(Box::new(MemoryCatalogTx { store: self.clone(), working }))
    }
}

struct MemoryCatalogTx {
    store: MemoryCatalogStore,
    working: Table,
}

#[async_trait]
impl CatalogTx for MemoryCatalogTx {
    async fn truncate_and_reset(&mut self) -> Result<(), StoreError> {
        self.working = Table::default();
        Ok(())
    }

    async fn bulk_insert(
        &mut self,
        records: &[ProductRecord],
        shape: RecordShape,
        ingested_at: NaiveDateTime,
    ) -> Result<u64, StoreError> {
        if self.store.shared.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Query("insert rejected".to_string()));
        }

        let mut keys: HashSet<(String, String)> = self
            .working
            .rows
            .iter()
            .filter_map(|row| row.record.business_key())
            .map(|(sku, source)| (sku.to_string(), source.to_string()))
            .collect();

        let mut inserted = 0;
        for record in records {
            if let Some((sku, source)) = record.business_key() {
                if !keys.insert((sku.to_string(), source.to_string())) {
                    continue;
                }
            }
            let mut record = record.clone();
            if !shape.includes_image() {
                record.image = None;
            }
            let id = self.working.next_id();
            self.working.rows.push(CatalogRow { id, record, created_at: ingested_at });
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn count_matching(&mut self, date: NaiveDate, hours: Range<u32>) -> Result<u64, StoreError> {
        let count = self
            .working
            .rows
            .iter()
            .filter(|row| row.created_at.date() == date && hours.contains(&row.created_at.hour()))
            .count();
        Ok(count as u64)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryCatalogTx { store, working } = *self;
        *store.lock() = working;
        Ok(())
    }
}
