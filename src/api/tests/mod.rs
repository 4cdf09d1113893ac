use super::*;
use crate::orchestrator::test_helpers::{assert_no_event, next_event};
use crate::types::{Event, Status};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt; // for oneshot()

/// Helper to create a test MediaDownloader instance wrapped in Arc
fn create_test_downloader() -> (Arc<MediaDownloader>, tempfile::TempDir) {
    let (downloader, temp_dir) = crate::orchestrator::test_helpers::create_test_downloader();
    (Arc::new(downloader), temp_dir)
}

fn test_router(downloader: &Arc<MediaDownloader>) -> Router {
    let config = downloader.get_config();
    create_router(downloader.clone(), config)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (downloader, _temp_dir) = create_test_downloader();
    let app = test_router(&downloader);

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_status_reports_idle_when_nothing_is_active() {
    let (downloader, _temp_dir) = create_test_downloader();
    let app = test_router(&downloader);

    let request = Request::builder()
        .uri("/status")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["state"], "idle");
}

#[tokio::test]
async fn test_start_download_is_accepted_and_failures_arrive_as_events() {
    let (downloader, _temp_dir) = create_test_downloader();
    let mut events = downloader.subscribe();
    let app = test_router(&downloader);

    // Empty URL: the request is still accepted; the rejection is an event
    let request = Request::builder()
        .method("POST")
        .uri("/download")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"url": ""}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.status(),
        StatusCode::ACCEPTED,
        "start is fire-and-forget; outcomes are not HTTP errors"
    );

    match next_event(&mut events).await {
        Event::Status {
            status, error_kind, ..
        } => {
            assert_eq!(status, Status::Failed);
            assert_eq!(error_kind, Some(crate::ErrorKind::InvalidUrl));
        }
        other => panic!("expected the INVALID_URL failure event, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_start_download_rejects_malformed_body() {
    let (downloader, _temp_dir) = create_test_downloader();
    let app = test_router(&downloader);

    let request = Request::builder()
        .method("POST")
        .uri("/download")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        response.status().is_client_error(),
        "malformed JSON must be a client error, got: {}",
        response.status()
    );
}

#[tokio::test]
async fn test_cancel_without_active_job_is_accepted_and_silent() {
    let (downloader, _temp_dir) = create_test_downloader();
    let mut events = downloader.subscribe();
    let app = test_router(&downloader);

    let request = Request::builder()
        .method("POST")
        .uri("/cancel")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_no_event(&mut events).await;
}

#[tokio::test]
async fn test_event_stream_responds_with_sse_content_type() {
    let (downloader, _temp_dir) = create_test_downloader();
    let app = test_router(&downloader);

    let request = Request::builder()
        .uri("/events")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(
        content_type.starts_with("text/event-stream"),
        "events route must speak SSE, got content-type: {content_type}"
    );
}

#[tokio::test]
async fn test_cors_enabled() {
    let (downloader, _temp_dir) = create_test_downloader();

    let mut config = (*downloader.get_config()).clone();
    config.api.cors_enabled = true;
    config.api.cors_origins = vec!["*".to_string()];
    let app = create_router(downloader.clone(), Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (downloader, _temp_dir) = create_test_downloader();

    // Port 0 = OS assigns a free port
    let mut config = (*downloader.get_config()).clone();
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let downloader = downloader.clone();
        let config = config.clone();
        async move { start_api_server(downloader, config).await }
    });

    // Give it a moment to start, then stop it
    tokio::time::sleep(Duration::from_millis(100)).await;
    api_handle.abort();
}

#[cfg(unix)]
#[tokio::test]
async fn test_status_reflects_a_running_job() {
    use crate::orchestrator::test_helpers::{SLOW_STUB, create_test_downloader_with_stub, wait_for_state};
    use crate::types::JobState;

    let (downloader, _temp_dir) = create_test_downloader_with_stub(SLOW_STUB);
    let downloader = Arc::new(downloader);
    let app = test_router(&downloader);

    downloader.start("https://valid/video", crate::DownloadOptions::default());
    wait_for_state(&downloader, JobState::Running).await;

    let request = Request::builder()
        .uri("/status")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["state"], "running");
    assert_eq!(json["url"], "https://valid/video");

    downloader.cancel();
}
