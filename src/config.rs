//! Configuration types for media-dl

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default name of the external executable, resolved via the host PATH when
/// no explicit path is configured
pub const YTDLP_BINARY: &str = "yt-dlp";

/// Download destination configuration
///
/// Groups settings for where and under which names finished files land.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Destination directory (default: the user's Downloads folder, falling
    /// back to "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
        }
    }
}

/// External tool configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Whether to search PATH for the executable if no explicit path is set
    /// (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            search_path: true,
        }
    }
}

impl ToolsConfig {
    /// Resolve the executable to launch.
    ///
    /// An explicitly configured path always wins. Otherwise the PATH is
    /// searched (unless disabled). When nothing is found the bare binary
    /// name is returned and the launch failure surfaces through the spawn
    /// error path, which is where missing-binary reporting lives.
    pub fn resolve_ytdlp(&self) -> PathBuf {
        if let Some(path) = &self.ytdlp_path {
            return path.clone();
        }
        if self.search_path
            && let Ok(found) = which::which(YTDLP_BINARY)
        {
            return found;
        }
        PathBuf::from(YTDLP_BINARY)
    }
}

/// Main configuration for [`MediaDownloader`](crate::MediaDownloader)
///
/// Sub-config fields are flattened for serialization, so the JSON/TOML
/// format stays flat (no nesting) apart from the `api` section.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Destination settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// External tool paths
    #[serde(flatten)]
    pub tools: ToolsConfig,

    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

// Convenience accessors for the most commonly read fields.
impl Config {
    /// Destination directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:6797)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_download_dir() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(|dir| dir.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("./downloads"))
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6797))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
