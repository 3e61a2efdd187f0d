//! Object-storage webhook endpoint.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{debug, info, warn};

use shelfsync_core::parse_event_batch;
use shelfsync_ingest::Verdict;

use super::{error_reply, status_for, ErrorResponse};
use crate::state::AppState;

/// Accept an S3 event envelope and ingest every referenced object.
///
/// The body is read as JSON whatever its `Content-Type`. Replies `200 OK`
/// when every notification was ingested, skipped or empty.
pub async fn minio_events(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let verbosity = state.ingest.error_verbosity;

    let batch = match parse_event_batch(&body) {
        Ok(batch) => batch,
        Err(e) => {
            warn!(error = %e, "Rejected event envelope");
            return error_reply(
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("Error", e.to_string(), None),
                verbosity,
            );
        }
    };

    if batch.is_empty() {
        debug!("Event envelope has no records");
        return (StatusCode::OK, "OK").into_response();
    }

    let result = state.orchestrator.ingest(&batch).await;
    info!(
        notifications = result.len(),
        ingested = result.ingested(),
        skipped = result.skipped(),
        failed = result.failed(),
        "Event batch processed"
    );

    match result.verdict() {
        Verdict::Accepted => (StatusCode::OK, "OK").into_response(),
        Verdict::Rejected(err) => error_reply(
            status_for(err),
            ErrorResponse::new(err.brief(), err.to_string(), Some(err.code())),
            verbosity,
        ),
    }
}
