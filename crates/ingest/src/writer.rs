//! Replace-upsert writer.
//!
//! Clears the catalog table and inserts the supplied records in one
//! transaction. Either the whole replace lands or the table is untouched.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

use shelfsync_core::{ProductRecord, RecordShape};

use crate::error::StoreError;
use crate::store::{CatalogStore, CatalogTx};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteReport {
    pub attempted: u64,
    pub persisted: u64,
}

impl WriteReport {
    /// Records skipped because an earlier record shared their business key.
    pub fn dropped_duplicates(&self) -> u64 {
        self.attempted.saturating_sub(self.persisted)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReplaceUpsertWriter {
    shape: RecordShape,
}

impl ReplaceUpsertWriter {
    pub fn new(shape: RecordShape) -> Self {
        Self { shape }
    }

    pub fn shape(&self) -> RecordShape {
        self.shape
    }

    /// Replace inside a caller-owned transaction. The caller commits.
    pub async fn write_in(
        &self,
        tx: &mut dyn CatalogTx,
        records: &[ProductRecord],
        ingested_at: NaiveDateTime,
    ) -> Result<WriteReport, StoreError> {
        tx.truncate_and_reset().await?;
        let persisted = tx.bulk_insert(records, self.shape, ingested_at).await?;
        let report = WriteReport { attempted: records.len() as u64, persisted };
        debug!(
            attempted = report.attempted,
            persisted = report.persisted,
            shape = %self.shape,
            "Catalog replaced"
        );
        Ok(report)
    }

    /// Replace in a fresh transaction and commit it.
    pub async fn write(
        &self,
        store: &dyn CatalogStore,
        records: &[ProductRecord],
        ingested_at: NaiveDateTime,
    ) -> Result<WriteReport, StoreError> {
        let mut tx = store.begin().await?;
        let report = self.write_in(tx.as_mut(), records, ingested_at).await?;
        tx.commit().await?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCatalogStore;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap().and_hms_opt(9, 30, 0).unwrap()
    }

    fn product(sku: Option<&str>, source: Option<&str>, name: &str) -> ProductRecord {
        ProductRecord {
            name: Some(name.to_string()),
            sku: sku.map(str::to_string),
            source: source.map(str::to_string),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn replaces_previous_contents() {
        let store = MemoryCatalogStore::new();
        let writer = ReplaceUpsertWriter::new(RecordShape::WithImage);

        writer.write(&store, &[product(Some("A"), Some("s"), "old")], now()).await.unwrap();
        let report = writer
            .write(&store, &[product(Some("B"), Some("s"), "new"), product(Some("C"), Some("s"), "new")], now())
            .await
            .unwrap();

        assert_eq!(report, WriteReport { attempted: 2, persisted: 2 });
        let rows = store.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, 1, "identity restarts");
        assert_eq!(rows[0].record.sku.as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn first_record_per_key_wins() {
        let store = MemoryCatalogStore::new();
        let writer = ReplaceUpsertWriter::new(RecordShape::WithImage);
        let report = writer
            .write(
                &store,
                &[
                    product(Some("A"), Some("s"), "first"),
                    product(Some("A"), Some("s"), "second"),
                    product(Some("A"), Some("other"), "third"),
                ],
                now(),
            )
            .await
            .unwrap();

        assert_eq!(report.dropped_duplicates(), 1);
        let rows = store.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].record.name.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn records_without_key_never_conflict() {
        let store = MemoryCatalogStore::new();
        let writer = ReplaceUpsertWriter::new(RecordShape::WithImage);
        let report = writer
            .write(&store, &[product(None, Some("s"), "a"), product(None, Some("s"), "b")], now())
            .await
            .unwrap();
        assert_eq!(report.persisted, 2);
    }

    #[tokio::test]
    async fn empty_batch_clears_table() {
        let store = MemoryCatalogStore::new();
        let writer = ReplaceUpsertWriter::new(RecordShape::WithImage);
        writer.write(&store, &[product(Some("A"), Some("s"), "a")], now()).await.unwrap();
        let report = writer.write(&store, &[], now()).await.unwrap();
        assert_eq!(report, WriteReport::default());
        assert!(store.rows().is_empty());
    }

    #[tokio::test]
    async fn failed_insert_leaves_table_untouched() {
        let store = MemoryCatalogStore::new();
        let writer = ReplaceUpsertWriter::new(RecordShape::WithImage);
        writer.write(&store, &[product(Some("A"), Some("s"), "keep")], now()).await.unwrap();

        store.fail_inserts(true);
        let err = writer.write(&store, &[product(Some("B"), Some("s"), "lost")], now()).await;
        assert!(err.is_err());

        let rows = store.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.name.as_deref(), Some("keep"));
    }

    #[tokio::test]
    async fn without_image_shape_drops_image() {
        let store = MemoryCatalogStore::new();
        let writer = ReplaceUpsertWriter::new(RecordShape::WithoutImage);
        let mut record = product(Some("A"), Some("s"), "a");
        record.image = Some("x.jpg".to_string());
        writer.write(&store, &[record], now()).await.unwrap();
        assert_eq!(store.rows()[0].record.image, None);
    }
}
