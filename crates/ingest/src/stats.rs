use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::orchestrator::NotificationOutcome;

/// Process-lifetime ingestion counters.
///
/// Counters are lock-free; the last-ingest timestamp sits behind a `RwLock`
/// since it changes at most once per notification.
#[derive(Debug, Default)]
pub struct IngestStats {
    batches: AtomicU64,
    notifications: AtomicU64,
    ingested: AtomicU64,
    skipped: AtomicU64,
    empty: AtomicU64,
    failed: AtomicU64,
    rows_attempted: AtomicU64,
    rows_persisted: AtomicU64,
    last_ingested_at: RwLock<Option<DateTime<Utc>>>,
}

/// Point-in-time copy of [`IngestStats`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub batches: u64,
    pub notifications: u64,
    pub ingested: u64,
    pub skipped: u64,
    pub empty: u64,
    pub failed: u64,
    pub rows_attempted: u64,
    pub rows_persisted: u64,
    /// Records dropped by business-key conflicts.
    pub duplicates_dropped: u64,
    pub last_ingested_at: Option<DateTime<Utc>>,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_batch(&self) {
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_outcome(&self, outcome: &NotificationOutcome) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
        match outcome {
            NotificationOutcome::Ingested(report) => {
                self.ingested.fetch_add(1, Ordering::Relaxed);
                self.rows_attempted.fetch_add(report.attempted, Ordering::Relaxed);
                self.rows_persisted.fetch_add(report.persisted, Ordering::Relaxed);
                if let Ok(mut last) = self.last_ingested_at.write() {
                    *last = Some(Utc::now());
                }
            }
            NotificationOutcome::Skipped(_) => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
            }
            NotificationOutcome::Empty => {
                self.empty.fetch_add(1, Ordering::Relaxed);
            }
            NotificationOutcome::Failed(_) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let attempted = self.rows_attempted.load(Ordering::Relaxed);
        let persisted = self.rows_persisted.load(Ordering::Relaxed);
        StatsSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            notifications: self.notifications.load(Ordering::Relaxed),
            ingested: self.ingested.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            empty: self.empty.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rows_attempted: attempted,
            rows_persisted: persisted,
            duplicates_dropped: attempted.saturating_sub(persisted),
            last_ingested_at: self.last_ingested_at.read().ok().and_then(|g| *g),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::SkipReason;
    use crate::error::{DecodeError, IngestError};
    use crate::writer::WriteReport;

    #[test]
    fn counts_each_outcome() {
        let stats = IngestStats::new();
        stats.record_batch();
        stats.record_outcome(&NotificationOutcome::Ingested(WriteReport { attempted: 5, persisted: 3 }));
        stats.record_outcome(&NotificationOutcome::Skipped(SkipReason::AlreadyIngested));
        stats.record_outcome(&NotificationOutcome::Empty);
        stats.record_outcome(&NotificationOutcome::Failed(IngestError::from(DecodeError::NotAnArray)));

        let snap = stats.snapshot();
        assert_eq!(snap.batches, 1);
        assert_eq!(snap.notifications, 4);
        assert_eq!(snap.ingested, 1);
        assert_eq!(snap.skipped, 1);
        assert_eq!(snap.empty, 1);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.duplicates_dropped, 2);
        assert!(snap.last_ingested_at.is_some());
    }

    #[test]
    fn fresh_snapshot_is_zeroed() {
        assert_eq!(IngestStats::new().snapshot(), StatsSnapshot::default());
    }
}
