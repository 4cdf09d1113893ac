//! Core types for media-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Requested output format for a download
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    /// Merged video+audio output
    Video,
    /// Audio-only extraction
    Audio,
}

/// Options for starting a download
///
/// Immutable once a job starts: the orchestrator copies the options into the
/// active job and never reads them from the caller again.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadOptions {
    /// Requested output format
    pub format: MediaFormat,

    /// Resolution hint for video downloads ("1080", "720", "best", …)
    #[serde(default = "default_quality")]
    pub quality: String,

    /// Opaque identifier pinning an exact source-reported stream; passed
    /// through to yt-dlp verbatim and overriding the quality hint
    #[serde(default, rename = "formatId", skip_serializing_if = "Option::is_none")]
    pub format_id: Option<String>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            format: MediaFormat::Video,
            quality: default_quality(),
            format_id: None,
        }
    }
}

fn default_quality() -> String {
    "best".to_string()
}

/// A decoded percentage/speed/ETA triple derived from process output
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressSample {
    /// Progress percentage (0.0 to 100.0)
    pub percentage: f32,
    /// Display speed string, unit-tagged (e.g. "1.2MiB/s")
    pub speed: String,
    /// Display ETA string, mm:ss or a placeholder when unknown
    pub eta: String,
}

/// Terminal status of a job
///
/// Serialized with the variant names as-is ("Completed", "Failed",
/// "Cancelled"), matching what presentation layers switch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// The process exited with code 0
    Completed,
    /// Spawn error, runtime error, or non-zero exit
    Failed,
    /// Ended through explicit cancellation
    Cancelled,
}

/// Event emitted during the download lifecycle
///
/// Delivered over the broadcast channel in the order produced; terminal
/// status events arrive exactly once per job, after all of that job's
/// progress events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A parsed progress sample from the running process
    Progress {
        /// Progress percentage (0.0 to 100.0)
        percentage: f32,
        /// Display speed string
        speed: String,
        /// Display ETA string
        eta: String,
    },

    /// A terminal status for the current job
    Status {
        /// Terminal status
        status: Status,
        /// Machine-readable failure classification, when failed
        #[serde(
            default,
            rename = "errorKind",
            skip_serializing_if = "Option::is_none"
        )]
        error_kind: Option<ErrorKind>,
        /// Human-readable summary suitable for direct display
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

/// Lifecycle state of the single active-job slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// No job active; the slot is free
    Idle,
    /// A job occupies the slot but the process is not yet confirmed spawned
    Starting,
    /// The process is running; progress events may arrive
    Running,
}

/// Snapshot of the active job for observers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobInfo {
    /// Target URL
    pub url: String,

    /// Current lifecycle state
    pub state: JobState,

    /// Options the job was started with
    pub options: DownloadOptions,

    /// Most recent progress sample, if any arrived yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_progress: Option<ProgressSample>,

    /// When the job was started
    pub started_at: DateTime<Utc>,
}
