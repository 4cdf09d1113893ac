//! Error types for media-dl
//!
//! This module provides error handling for the library, including:
//! - The main [`Error`] type covering every failure a job can hit
//! - A machine-readable [`ErrorKind`] classification delivered in status
//!   events, so presentation layers can react programmatically
//! - Human-readable messages suitable for direct display

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
///
/// Job failures are never returned to the caller of `start`/`cancel` (both
/// are fire-and-forget) but are classified through [`Error::kind`] and
/// carried in the terminal `Failed` status event.
#[derive(Debug, Error)]
pub enum Error {
    /// Start requested with an empty or missing URL
    #[error("no URL provided")]
    InvalidUrl,

    /// Start requested while another job is active
    #[error("a download is already in progress")]
    AlreadyRunning,

    /// The external executable could not be located or launched
    #[error(
        "failed to launch '{binary}': {source}. \
         Install yt-dlp or point tools.ytdlp_path at the binary."
    )]
    Spawn {
        /// The executable that was invoked
        binary: String,
        /// The underlying launch failure
        #[source]
        source: std::io::Error,
    },

    /// The external process exited unsuccessfully
    #[error("{}", process_failure_message(.code, .detail))]
    ProcessFailed {
        /// Exit code, `None` when the process died from a signal
        code: Option<i32>,
        /// Trailing stderr output, when any was captured
        detail: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Machine-readable classification of a download failure
///
/// Serialized into the `errorKind` field of status events using the wire
/// names below.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Empty or missing URL
    InvalidUrl,
    /// A job was already active when start was requested
    AlreadyRunning,
    /// The external executable cannot be located or launched
    SystemError,
    /// The job ended through explicit cancellation
    UserCancelled,
    /// Non-zero exit or runtime error with no more specific classification
    Unknown,
}

impl Error {
    /// Classify this error for the `errorKind` field of a status event
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidUrl => ErrorKind::InvalidUrl,
            Error::AlreadyRunning => ErrorKind::AlreadyRunning,
            Error::Spawn { .. } => ErrorKind::SystemError,
            Error::ProcessFailed { .. } => ErrorKind::Unknown,
            Error::Io(_) => ErrorKind::Unknown,
            Error::ApiServerError(_) => ErrorKind::Unknown,
        }
    }
}

fn process_failure_message(code: &Option<i32>, detail: &Option<String>) -> String {
    let base = match code {
        Some(code) => format!("yt-dlp exited with code {}", code),
        None => "yt-dlp was terminated by a signal".to_string(),
    };
    match detail {
        Some(detail) if !detail.is_empty() => format!("{}: {}", base, detail),
        _ => base,
    }
}
