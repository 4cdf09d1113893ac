//! Core orchestrator implementation split into focused submodules.
//!
//! The `MediaDownloader` struct and its methods are organized by domain:
//! - [`args`] - yt-dlp argument construction
//! - [`control`] - job lifecycle control (start/cancel/shutdown) and the
//!   event pump

mod args;
mod control;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::process::ProcessHandle;
use crate::types::{DownloadOptions, Event, JobInfo, JobState, ProgressSample};
use chrono::{DateTime, Utc};
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// One in-flight extraction occupying the single active slot
pub(crate) struct ActiveJob {
    /// Generation number distinguishing this job from its successors; pump
    /// tasks release the slot only if the generation still matches
    pub(crate) generation: u64,
    pub(crate) url: String,
    pub(crate) options: DownloadOptions,
    pub(crate) state: JobState,
    pub(crate) last_progress: Option<ProgressSample>,
    pub(crate) started_at: DateTime<Utc>,
    /// Set by cancel(); gates suppression of the process's eventual exit
    pub(crate) cancelled: CancellationToken,
    /// Graceful-termination handle for the underlying process
    pub(crate) handle: ProcessHandle,
}

/// Main orchestrator instance (cloneable - all fields are Arc-wrapped)
///
/// Owns the single active-job slot, translates supervised process output
/// into typed events, and publishes them on a broadcast channel.
#[derive(Clone)]
pub struct MediaDownloader {
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// The single active-job slot. A std Mutex, not a tokio one: start and
    /// cancel are synchronous and the critical sections never await.
    pub(crate) slot: Arc<Mutex<Option<ActiveJob>>>,
    /// Monotonic generation counter backing slot ownership checks
    pub(crate) generation: Arc<AtomicU64>,
}

/// Lock the slot, recovering from a poisoned mutex.
///
/// A panic inside one of the short critical sections cannot leave the slot
/// in a torn state (it holds a plain Option), so continuing with the inner
/// value is sound.
pub(crate) fn lock_slot(slot: &Mutex<Option<ActiveJob>>) -> MutexGuard<'_, Option<ActiveJob>> {
    slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl MediaDownloader {
    /// Create a new orchestrator instance.
    ///
    /// Ensures the destination directory exists and sets up the event
    /// broadcast channel. No process is spawned until [`start`] is called.
    ///
    /// [`start`]: MediaDownloader::start
    pub fn new(config: Config) -> Result<Self> {
        std::fs::create_dir_all(config.download_dir()).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create download directory '{}': {}",
                    config.download_dir().display(),
                    e
                ),
            ))
        })?;

        // Buffer of 1000 events; a subscriber lagging further behind
        // receives RecvError::Lagged rather than stalling the orchestrator
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        Ok(Self {
            event_tx,
            config: Arc::new(config),
            slot: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Subscribe to download events
    ///
    /// Multiple subscribers are supported; each receives all events
    /// independently, in the order they were produced.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use media_dl::{Config, MediaDownloader};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = MediaDownloader::new(Config::default())?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "download event");
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    ///
    /// The configuration is wrapped in an Arc, so this is a cheap clone.
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Current lifecycle state of the active slot
    pub fn state(&self) -> JobState {
        lock_slot(&self.slot)
            .as_ref()
            .map(|job| job.state)
            .unwrap_or(JobState::Idle)
    }

    /// Snapshot of the active job, or `None` when idle
    pub fn job_info(&self) -> Option<JobInfo> {
        lock_slot(&self.slot).as_ref().map(|job| JobInfo {
            url: job.url.clone(),
            state: job.state,
            options: job.options.clone(),
            last_progress: job.last_progress.clone(),
            started_at: job.started_at,
        })
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers the event is silently dropped;
    /// downloads proceed whether or not anyone is listening.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server runs concurrently with download supervision and listens on
    /// the configured bind address (default: 127.0.0.1:6797).
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}
