//! HTTP endpoint handlers.
//!
//! Shared error body and status mapping live here in mod.rs.

mod events;
mod health;


use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use shelfsync_core::config::ErrorVerbosity;
use shelfsync_ingest::IngestError;

// ── Shared types ─────────────────────────────────────────────────

/// Longest `message` returned to callers, in characters.
const MAX_MESSAGE_CHARS: usize = 300;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl ErrorResponse {
    pub fn new(error: &'static str, message: impl AsRef<str>, code: Option<&'static str>) -> Self {
        Self {
            error,
            message: truncate_message(message.as_ref()),
            code,
        }
    }
}

/// Truncate to [`MAX_MESSAGE_CHARS`] characters, marking the cut with `…`.
pub(crate) fn truncate_message(msg: &str) -> String {
    match msg.char_indices().nth(MAX_MESSAGE_CHARS) {
        Some((cut, _)) => format!("{}…", &msg[..cut]),
        None => msg.to_string(),
    }
}

/// 502 when the cause is network-level, 500 otherwise.
pub(crate) fn status_for(err: &IngestError) -> StatusCode {
    if err.is_connectivity() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Render a failure according to the configured verbosity.
pub(crate) fn error_reply(status: StatusCode, body: ErrorResponse, verbosity: ErrorVerbosity) -> Response {
    match verbosity {
        ErrorVerbosity::Classified => (status, Json(body)).into_response(),
        ErrorVerbosity::Terse => status.into_response(),
    }
}

// ── Re-exports ───────────────────────────────────────────────────

pub use events::minio_events;
pub use health::{health, root, stats};
