//! API route handlers.

use crate::api::AppState;
use crate::types::{DownloadOptions, Event, JobState};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

/// Request body for POST /download
#[derive(Debug, Deserialize)]
pub struct StartDownloadRequest {
    /// Target media URL
    pub url: String,

    /// Download options (format, quality, optional pinned format id)
    #[serde(default)]
    pub options: DownloadOptions,
}

/// POST /download - Start a download
///
/// Always answers 202: start is fire-and-forget and every outcome,
/// including precondition failures like ALREADY_RUNNING, is delivered on
/// the event stream, so the presentation layer has a single place to watch.
pub async fn start_download(
    State(state): State<AppState>,
    Json(request): Json<StartDownloadRequest>,
) -> impl IntoResponse {
    state.downloader.start(&request.url, request.options);
    (StatusCode::ACCEPTED, Json(json!({"accepted": true})))
}

/// POST /cancel - Cancel the active download
///
/// A no-op (still 202) when nothing is active.
pub async fn cancel_download(State(state): State<AppState>) -> impl IntoResponse {
    state.downloader.cancel();
    (StatusCode::ACCEPTED, Json(json!({"accepted": true})))
}

/// GET /status - Snapshot of the active job
pub async fn job_status(State(state): State<AppState>) -> Response {
    match state.downloader.job_info() {
        Some(info) => (StatusCode::OK, Json(info)).into_response(),
        None => (
            StatusCode::OK,
            Json(json!({"state": JobState::Idle})),
        )
            .into_response(),
    }
}

/// GET /health - Health check
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /events - Server-sent events stream
///
/// Streams every orchestrator event as SSE, named "progress" or "status",
/// with the JSON payload in the data field.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = std::result::Result<SseEvent, Infallible>>> {
    let receiver = state.downloader.subscribe();
    let stream = BroadcastStream::new(receiver);

    let sse_stream = stream.filter_map(|result| match result {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(json_data) => {
                let event_type = match &event {
                    Event::Progress { .. } => "progress",
                    Event::Status { .. } => "status",
                };

                Some(Ok(SseEvent::default().event(event_type).data(json_data)))
            }
            Err(e) => {
                tracing::warn!("Failed to serialize event to JSON: {}", e);
                None
            }
        },
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!("SSE client lagged, skipped {} events", skipped);
            Some(Ok(SseEvent::default().event("error").data(format!(
                r#"{{"error":"lagged","skipped":{}}}"#,
                skipped
            ))))
        }
    });

    Sse::new(sse_stream).keep_alive(KeepAlive::default())
}
