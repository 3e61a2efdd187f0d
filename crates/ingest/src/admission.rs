//! Time-slot admission gate.
//!
//! The day is split into windows starting at each configured slot hour and
//! running to the next slot hour (the last slot runs to midnight). A batch is
//! admitted at most once per window: if the catalog already holds rows
//! created inside the current window, ingestion is skipped.

use std::fmt;
use std::ops::Range;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

use crate::error::StoreError;
use crate::store::CatalogTx;

/// The active ingestion window: `[hour, end_hour)` on the current day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub hour: u32,
    pub end_hour: u32,
}

impl Slot {
    pub fn hours(&self) -> Range<u32> {
        self.hour..self.end_hour
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00-{:02}:00", self.hour, self.end_hour)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Current hour precedes the earliest slot.
    OutOfWindow,
    /// The current window already has rows.
    AlreadyIngested,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::OutOfWindow => write!(f, "outside ingestion window"),
            SkipReason::AlreadyIngested => write!(f, "already ingested in current slot"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed(Option<Slot>),
    Skip(SkipReason),
}

/// Snapshot of the gate's view at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionWindow {
    pub date: NaiveDate,
    pub slot: Option<Slot>,
    pub existing: u64,
}

/// Decides whether an ingestion may proceed.
///
/// An ungated gate (no slots) always proceeds.
#[derive(Debug, Clone, Default)]
pub struct AdmissionGate {
    slots: Vec<u32>,
}

impl AdmissionGate {
    /// `slots` are hours of day. Duplicates and out-of-range hours are dropped.
    pub fn new(slots: impl IntoIterator<Item = u32>) -> Self {
        let mut slots: Vec<u32> = slots.into_iter().filter(|h| *h < 24).collect();
        slots.sort_unstable();
        slots.dedup();
        Self { slots }
    }

    pub fn ungated() -> Self {
        Self::default()
    }

    pub fn is_gated(&self) -> bool {
        !self.slots.is_empty()
    }

    pub fn slots(&self) -> &[u32] {
        &self.slots
    }

    /// Latest slot at or before `now`'s hour, if any.
    pub fn target_slot(&self, now: NaiveDateTime) -> Option<Slot> {
        let hour = now.hour();
        let idx = self.slots.iter().rposition(|s| *s <= hour)?;
        let end_hour = self.slots.get(idx + 1).copied().unwrap_or(24);
        Some(Slot { hour: self.slots[idx], end_hour })
    }

    /// Count existing rows inside the active window. Returns `None` when
    /// gated and `now` precedes every slot.
    pub async fn window(
        &self,
        tx: &mut dyn CatalogTx,
        now: NaiveDateTime,
    ) -> Result<Option<AdmissionWindow>, StoreError> {
        let date = now.date();
        if !self.is_gated() {
            return Ok(Some(AdmissionWindow { date, slot: None, existing: 0 }));
        }
        let Some(slot) = self.target_slot(now) else {
            return Ok(None);
        };
        let existing = tx.count_matching(date, slot.hours()).await?;
        Ok(Some(AdmissionWindow { date, slot: Some(slot), existing }))
    }

    /// Read-only: never mutates the catalog.
    pub async fn admit(&self, tx: &mut dyn CatalogTx, now: NaiveDateTime) -> Result<Decision, StoreError> {
        let decision = match self.window(tx, now).await? {
            None => Decision::Skip(SkipReason::OutOfWindow),
            Some(w) if w.existing > 0 => Decision::Skip(SkipReason::AlreadyIngested),
            Some(w) => Decision::Proceed(w.slot),
        };
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCatalogStore;
    use crate::store::CatalogStore;
    use chrono::NaiveDate;
    use shelfsync_core::{ProductRecord, RecordShape};

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn gate() -> AdmissionGate {
        AdmissionGate::new([21, 9, 15])
    }

    #[test]
    fn maps_hours_to_latest_slot() {
        let g = gate();
        assert_eq!(g.target_slot(at(16, 30)), Some(Slot { hour: 15, end_hour: 21 }));
        assert_eq!(g.target_slot(at(15, 0)), Some(Slot { hour: 15, end_hour: 21 }));
        assert_eq!(g.target_slot(at(22, 5)), Some(Slot { hour: 21, end_hour: 24 }));
        assert_eq!(g.target_slot(at(9, 0)), Some(Slot { hour: 9, end_hour: 15 }));
        assert_eq!(g.target_slot(at(7, 59)), None);
        assert_eq!(g.target_slot(at(0, 0)), None);
    }

    #[test]
    fn slot_renders_as_hour_range() {
        assert_eq!(Slot { hour: 9, end_hour: 15 }.to_string(), "09:00-15:00");
        assert_eq!(Slot { hour: 21, end_hour: 24 }.to_string(), "21:00-24:00");
    }

    #[test]
    fn slots_are_normalized() {
        let g = AdmissionGate::new([15, 9, 15, 30]);
        assert_eq!(g.slots(), &[9, 15]);
    }

    #[tokio::test]
    async fn out_of_window_skips_without_counting() {
        let store = MemoryCatalogStore::new();
        let mut tx = store.begin().await.unwrap();
        let decision = gate().admit(tx.as_mut(), at(7, 0)).await.unwrap();
        assert_eq!(decision, Decision::Skip(SkipReason::OutOfWindow));
    }

    #[tokio::test]
    async fn existing_rows_in_window_skip() {
        let store = MemoryCatalogStore::new();
        let record = ProductRecord { sku: Some("A".into()), source: Some("s".into()), ..Default::default() };

        let mut tx = store.begin().await.unwrap();
        tx.bulk_insert(&[record], RecordShape::WithImage, at(16, 10)).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let decision = gate().admit(tx.as_mut(), at(18, 0)).await.unwrap();
        assert_eq!(decision, Decision::Skip(SkipReason::AlreadyIngested));

        // Next window is open again.
        let decision = gate().admit(tx.as_mut(), at(21, 0)).await.unwrap();
        assert_eq!(decision, Decision::Proceed(Some(Slot { hour: 21, end_hour: 24 })));
    }

    #[tokio::test]
    async fn ungated_always_proceeds() {
        let store = MemoryCatalogStore::new();
        let mut tx = store.begin().await.unwrap();
        let decision = AdmissionGate::ungated().admit(tx.as_mut(), at(3, 0)).await.unwrap();
        assert_eq!(decision, Decision::Proceed(None));
    }
}
