//! PostgreSQL-backed catalog store.

use std::ops::Range;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use shelfsync_core::{ProductRecord, RecordShape};
use shelfsync_ingest::{CatalogStore, CatalogTx, StoreError};
use shelfsync_storage::error::classify_error_chain;
use shelfsync_storage::Connectivity;

/// Advisory lock key held for the lifetime of every catalog transaction.
/// Serializes admission and replace across service replicas.
const CATALOG_LOCK_KEY: i64 = 0x5e1f_5c0c;

/// Postgres caps a statement at 65535 bind parameters.
const MAX_BIND_PARAMS: usize = 65_535;

pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn begin(&self) -> Result<Box<dyn CatalogTx>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(CATALOG_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;
        Ok(Box::new(PgCatalogTx { tx }))
    }
}

struct PgCatalogTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CatalogTx for PgCatalogTx {
    async fn truncate_and_reset(&mut self) -> Result<(), StoreError> {
        sqlx::query("TRUNCATE TABLE products RESTART IDENTITY")
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn bulk_insert(
        &mut self,
        records: &[ProductRecord],
        shape: RecordShape,
        ingested_at: NaiveDateTime,
    ) -> Result<u64, StoreError> {
        let mut inserted = 0;
        for chunk in records.chunks(rows_per_statement(shape)) {
            let mut qb = insert_statement(chunk, shape, ingested_at);
            let result = qb.build().execute(&mut *self.tx).await.map_err(store_error)?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    async fn count_matching(&mut self, date: NaiveDate, hours: Range<u32>) -> Result<u64, StoreError> {
        let midnight = date.and_time(NaiveTime::MIN);
        let from = midnight + TimeDelta::hours(i64::from(hours.start));
        let until = midnight + TimeDelta::hours(i64::from(hours.end));

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE created_at >= $1 AND created_at < $2",
        )
        .bind(from)
        .bind(until)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(store_error)?;
        Ok(count.max(0) as u64)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        this.tx.commit().await.map_err(store_error)
    }
}

/// One bind per column plus `created_at`.
fn rows_per_statement(shape: RecordShape) -> usize {
    MAX_BIND_PARAMS / (shape.columns().len() + 1)
}

fn insert_statement(
    chunk: &[ProductRecord],
    shape: RecordShape,
    ingested_at: NaiveDateTime,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("INSERT INTO products (");
    qb.push(shape.columns().join(", "));
    qb.push(", created_at) ");
    qb.push_values(chunk, |mut row, r| {
        row.push_bind(r.name.clone())
            .push_bind(r.price)
            .push_bind(r.brand.clone())
            .push_bind(r.sku.clone())
            .push_bind(r.currency.clone())
            .push_bind(r.source.clone())
            .push_bind(r.category.clone());
        if shape.includes_image() {
            row.push_bind(r.image.clone());
        }
        row.push_bind(ingested_at);
    });
    qb.push(" ON CONFLICT (sku, source) DO NOTHING");
    qb
}

/// Map a sqlx error, keeping connection-level failures distinguishable.
fn store_error(err: sqlx::Error) -> StoreError {
    let kind = match &err {
        sqlx::Error::PoolTimedOut => Some(Connectivity::TimedOut),
        sqlx::Error::Database(_) => None,
        _ => classify_error_chain(&err),
    };
    match kind {
        Some(kind) => StoreError::Unavailable { kind, message: err.to_string() },
        None => StoreError::Query(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn chunks_fit_bind_limit() {
        for shape in [RecordShape::WithImage, RecordShape::WithoutImage] {
            let rows = rows_per_statement(shape);
            assert!(rows * (shape.columns().len() + 1) <= MAX_BIND_PARAMS);
            assert!(rows > 1000);
        }
    }

    #[test]
    fn insert_sql_matches_shape() {
        let at = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap().and_hms_opt(9, 0, 0).unwrap();
        let records = vec![ProductRecord::default(), ProductRecord::default()];

        let qb = insert_statement(&records, RecordShape::WithoutImage, at);
        let sql = qb.sql();
        assert!(sql.starts_with(
            "INSERT INTO products (name, price, brand, sku, currency, source, category, created_at) VALUES"
        ));
        assert!(sql.ends_with("ON CONFLICT (sku, source) DO NOTHING"));
        assert!(sql.contains("$16"));
        assert!(!sql.contains("$17"));

        let qb = insert_statement(&records, RecordShape::WithImage, at);
        let sql = qb.sql();
        assert!(sql.contains("category, image, created_at"));
        assert!(sql.contains("$18"));
    }

    #[test]
    fn pool_timeout_is_connectivity() {
        let err = store_error(sqlx::Error::PoolTimedOut);
        assert_eq!(err.connectivity(), Some(Connectivity::TimedOut));
    }

    #[test]
    fn io_refused_is_connectivity() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let err = store_error(sqlx::Error::Io(io));
        assert_eq!(err.connectivity(), Some(Connectivity::Refused));
    }

    #[test]
    fn row_not_found_is_query_error() {
        let err = store_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Query(_)));
    }
}
