use std::time::Instant;

use shelfsync_core::config::IngestConfig;
use shelfsync_ingest::Orchestrator;

/// Shared application state for all route handlers.
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub ingest: IngestConfig,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, ingest: IngestConfig) -> Self {
        Self {
            orchestrator,
            ingest,
            started_at: Instant::now(),
        }
    }
}
