//! Event-to-storage ingestion pipeline.
//!
//! - [`decoder`]: payload bytes to [`ProductRecord`](shelfsync_core::ProductRecord)s
//! - [`admission`]: time-slot deduplication gate
//! - [`writer`]: transactional replace-upsert into the catalog table
//! - [`orchestrator`]: per-batch driver tying the above together

pub mod admission;
pub mod clock;
pub mod decoder;
pub mod error;
pub mod memory;
pub mod orchestrator;
pub mod stats;
pub mod store;
pub mod writer;

pub use admission::{AdmissionGate, AdmissionWindow, Decision, SkipReason, Slot};
pub use clock::{Clock, FixedClock, SystemClock};
pub use decoder::decode;
pub use error::{DecodeError, IngestError, StoreError};
pub use orchestrator::{BatchResult, NotificationOutcome, NotificationResult, Orchestrator, Verdict};
pub use stats::{IngestStats, StatsSnapshot};
pub use store::{CatalogStore, CatalogTx};
pub use writer::{ReplaceUpsertWriter, WriteReport};
