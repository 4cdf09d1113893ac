//! Shared test helpers for orchestrator tests.

use crate::config::Config;
use crate::orchestrator::MediaDownloader;
use crate::types::Event;
use std::time::Duration;
use tokio::sync::broadcast;

/// Helper to create a test MediaDownloader instance.
/// Returns the downloader and the tempdir (which must be kept alive).
///
/// PATH search is disabled so tests can never pick up a real yt-dlp.
pub(crate) fn create_test_downloader() -> (MediaDownloader, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    config.tools.search_path = false;

    let downloader = MediaDownloader::new(config).unwrap();
    (downloader, temp_dir)
}

/// Helper to create a test MediaDownloader whose yt-dlp is a stub shell
/// script with the given body.
#[cfg(unix)]
pub(crate) fn create_test_downloader_with_stub(script: &str) -> (MediaDownloader, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let stub = write_stub_binary(temp_dir.path(), script);

    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    config.tools.ytdlp_path = Some(stub);
    config.tools.search_path = false;

    let downloader = MediaDownloader::new(config).unwrap();
    (downloader, temp_dir)
}

/// Write an executable shell script standing in for yt-dlp.
#[cfg(unix)]
pub(crate) fn write_stub_binary(dir: &std::path::Path, script: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("yt-dlp-stub");
    std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Stub body that keeps the job running until terminated, exiting with a
/// non-zero code when the termination request lands.
///
/// `sleep` runs in the background so the TERM trap fires immediately
/// instead of after the sleep finishes.
#[cfg(unix)]
pub(crate) const SLOW_STUB: &str = "trap 'exit 7' TERM\nsleep 30 &\nwait";

/// Receive the next event, failing the test on timeout.
pub(crate) async fn next_event(rx: &mut broadcast::Receiver<Event>) -> Event {
    tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Assert that no further events arrive within a grace window.
pub(crate) async fn assert_no_event(rx: &mut broadcast::Receiver<Event>) {
    tokio::time::sleep(Duration::from_millis(300)).await;
    match rx.try_recv() {
        Err(broadcast::error::TryRecvError::Empty) => {}
        other => panic!("expected no further events, got: {other:?}"),
    }
}

/// Poll until the orchestrator reaches the given state.
#[cfg(unix)]
pub(crate) async fn wait_for_state(downloader: &MediaDownloader, state: crate::types::JobState) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while downloader.state() != state {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for state {state:?}, current: {:?}",
            downloader.state()
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
