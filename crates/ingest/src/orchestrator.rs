//! Per-batch ingestion driver.
//!
//! Each notification is fetched, decoded, admitted and written in order.
//! A failure is recorded against its own notification and the batch moves on.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use shelfsync_core::config::{AdmissionMode, IngestConfig};
use shelfsync_core::{IngestionNotification, RecordShape};
use shelfsync_storage::{Connectivity, FetchError, ObjectFetcher};

use crate::admission::{AdmissionGate, Decision, SkipReason};
use crate::clock::{Clock, SystemClock};
use crate::decoder::decode;
use crate::error::IngestError;
use crate::stats::IngestStats;
use crate::store::CatalogStore;
use crate::writer::{ReplaceUpsertWriter, WriteReport};

#[derive(Debug)]
pub enum NotificationOutcome {
    Ingested(WriteReport),
    Skipped(SkipReason),
    /// The payload decoded to zero records; nothing was written.
    Empty,
    Failed(IngestError),
}

#[derive(Debug)]
pub struct NotificationResult {
    pub notification: IngestionNotification,
    pub outcome: NotificationOutcome,
}

/// Overall verdict for a batch.
#[derive(Debug)]
pub enum Verdict<'a> {
    Accepted,
    Rejected(&'a IngestError),
}

#[derive(Debug, Default)]
pub struct BatchResult {
    pub results: Vec<NotificationResult>,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &IngestError> {
        self.results.iter().filter_map(|r| match &r.outcome {
            NotificationOutcome::Failed(e) => Some(e),
            _ => None,
        })
    }

    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    pub fn ingested(&self) -> usize {
        self.count(|o| matches!(o, NotificationOutcome::Ingested(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, NotificationOutcome::Skipped(_)))
    }

    fn count(&self, pred: impl Fn(&NotificationOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }

    /// Accepted when nothing failed. Otherwise the first non-connectivity
    /// failure is reported, falling back to the first connectivity failure.
    pub fn verdict(&self) -> Verdict<'_> {
        let mut first_connectivity = None;
        for err in self.failures() {
            if !err.is_connectivity() {
                return Verdict::Rejected(err);
            }
            first_connectivity.get_or_insert(err);
        }
        match first_connectivity {
            Some(err) => Verdict::Rejected(err),
            None => Verdict::Accepted,
        }
    }
}

pub struct Orchestrator {
    fetcher: Arc<dyn ObjectFetcher>,
    store: Arc<dyn CatalogStore>,
    gate: Option<AdmissionGate>,
    writer: ReplaceUpsertWriter,
    clock: Arc<dyn Clock>,
    stats: Arc<IngestStats>,
    fetch_timeout: Duration,
    /// Serializes admission checks with writes.
    write_lock: Mutex<()>,
}

impl Orchestrator {
    pub fn new(fetcher: Arc<dyn ObjectFetcher>, store: Arc<dyn CatalogStore>, config: &IngestConfig) -> Self {
        let gate = match config.admission_mode {
            AdmissionMode::Gated => Some(AdmissionGate::new(config.slots.iter().copied())),
            AdmissionMode::Ungated => None,
        };
        Self {
            fetcher,
            store,
            gate,
            writer: ReplaceUpsertWriter::new(config.record_shape),
            clock: Arc::new(SystemClock),
            stats: Arc::new(IngestStats::new()),
            fetch_timeout: config.fetch_timeout(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_stats(mut self, stats: Arc<IngestStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn stats(&self) -> &Arc<IngestStats> {
        &self.stats
    }

    pub fn record_shape(&self) -> RecordShape {
        self.writer.shape()
    }

    /// Process every notification in order. Never aborts early.
    pub async fn ingest(&self, batch: &[IngestionNotification]) -> BatchResult {
        self.stats.record_batch();
        let mut results = Vec::with_capacity(batch.len());
        for notification in batch {
            let outcome = match self.ingest_one(notification).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(
                        bucket = %notification.bucket,
                        key = %notification.key,
                        code = err.code(),
                        error = %err,
                        "Ingestion failed"
                    );
                    NotificationOutcome::Failed(err)
                }
            };
            self.stats.record_outcome(&outcome);
            results.push(NotificationResult { notification: notification.clone(), outcome });
        }
        BatchResult { results }
    }

    async fn ingest_one(&self, n: &IngestionNotification) -> Result<NotificationOutcome, IngestError> {
        let bytes = self.fetch(n).await?;
        let records = decode(&bytes, self.writer.shape())?;
        debug!(bucket = %n.bucket, key = %n.key, records = records.len(), "Payload decoded");

        if records.is_empty() {
            info!(bucket = %n.bucket, key = %n.key, "Payload has no records, nothing written");
            return Ok(NotificationOutcome::Empty);
        }

        if let Some(gate) = &self.gate {
            if gate.target_slot(self.clock.now()).is_none() {
                info!(
                    bucket = %n.bucket,
                    key = %n.key,
                    records = records.len(),
                    reason = %SkipReason::OutOfWindow,
                    "Ingestion skipped"
                );
                return Ok(NotificationOutcome::Skipped(SkipReason::OutOfWindow));
            }
        }

        let _guard = self.write_lock.lock().await;
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let mut slot = None;
        if let Some(gate) = &self.gate {
            match gate.admit(tx.as_mut(), now).await? {
                Decision::Proceed(s) => slot = s,
                Decision::Skip(reason) => {
                    info!(
                        bucket = %n.bucket,
                        key = %n.key,
                        records = records.len(),
                        reason = %reason,
                        "Ingestion skipped"
                    );
                    return Ok(NotificationOutcome::Skipped(reason));
                }
            }
        }

        let report = self.writer.write_in(tx.as_mut(), &records, now).await?;
        tx.commit().await?;

        info!(
            bucket = %n.bucket,
            key = %n.key,
            records = records.len(),
            slot = %slot.map_or_else(|| "ungated".to_string(), |s| s.to_string()),
            attempted = report.attempted,
            persisted = report.persisted,
            "Catalog ingested"
        );
        if report.dropped_duplicates() > 0 {
            debug!(dropped = report.dropped_duplicates(), key = %n.key, "Duplicate business keys dropped");
        }
        Ok(NotificationOutcome::Ingested(report))
    }

    async fn fetch(&self, n: &IngestionNotification) -> Result<bytes::Bytes, IngestError> {
        let fetched = tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(&n.bucket, &n.key)).await;
        let result = fetched.unwrap_or_else(|_| {
            Err(FetchError::Connectivity {
                kind: Connectivity::TimedOut,
                message: format!("fetch exceeded {}s", self.fetch_timeout.as_secs()),
            })
        });
        result.map_err(|source| IngestError::FetchFailed {
            bucket: n.bucket.clone(),
            key: n.key.clone(),
            source,
        })
    }
}
