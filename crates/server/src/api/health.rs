//! Liveness, health and ingestion stats endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use shelfsync_core::config::{AdmissionMode, ErrorVerbosity};
use shelfsync_core::RecordShape;
use shelfsync_ingest::StatsSnapshot;

use crate::state::AppState;

// ── Liveness & Health ─────────────────────────────────────────────

/// Plain-text liveness check for platform load balancers.
pub async fn root() -> &'static str {
    "OK"
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Seconds since startup.
    pub uptime: f64,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}

// ── Stats ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub counters: StatsSnapshot,
    pub admission_mode: AdmissionMode,
    pub slots: Vec<u32>,
    pub record_shape: RecordShape,
    pub error_verbosity: ErrorVerbosity,
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        counters: state.orchestrator.stats().snapshot(),
        admission_mode: state.ingest.admission_mode,
        slots: state.ingest.slots.clone(),
        record_shape: state.orchestrator.record_shape(),
        error_verbosity: state.ingest.error_verbosity,
    })
}
