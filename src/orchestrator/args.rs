//! yt-dlp argument construction

use crate::config::Config;
use crate::types::{DownloadOptions, MediaFormat};

/// Progress template producing the three pipe-separated fields consumed by
/// [`crate::progress::parse_progress_line`]
pub(crate) const PROGRESS_TEMPLATE: &str =
    "%(progress._percent_str)s|%(progress._speed_str)s|%(progress._eta_str)s";

/// Title-and-extension naming pattern inside the destination directory
pub(crate) const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Container requested for merged video output
const VIDEO_CONTAINER: &str = "mp4";

/// Codec requested for audio-only extraction
const AUDIO_CODEC: &str = "mp3";

/// Map a quality hint to a yt-dlp format selector.
///
/// Kept as an explicit rule table: "1080" and "720" bound the stream height,
/// anything else means best available, unbounded.
fn video_format_selector(quality: &str) -> &'static str {
    match quality {
        "1080" => "bestvideo[height<=1080]+bestaudio/best[height<=1080]",
        "720" => "bestvideo[height<=720]+bestaudio/best[height<=720]",
        _ => "bestvideo+bestaudio/best",
    }
}

/// Build the full argument list for one download.
///
/// Every invocation requests newline-delimited template progress output and
/// a title-based destination path; the format arguments depend on the
/// requested [`MediaFormat`]. The URL is always the final argument.
pub(crate) fn build_args(url: &str, options: &DownloadOptions, config: &Config) -> Vec<String> {
    let output = config.download_dir().join(OUTPUT_TEMPLATE);

    let mut args = vec![
        "--newline".to_string(),
        "--progress-template".to_string(),
        PROGRESS_TEMPLATE.to_string(),
        "-o".to_string(),
        output.to_string_lossy().into_owned(),
    ];

    match options.format {
        MediaFormat::Audio => {
            args.push("-x".to_string());
            args.push("--audio-format".to_string());
            args.push(AUDIO_CODEC.to_string());
        }
        MediaFormat::Video => {
            // An explicit format id pins an exact source-reported stream and
            // is passed through verbatim, overriding the quality hint.
            let selector = match &options.format_id {
                Some(id) => id.clone(),
                None => video_format_selector(&options.quality).to_string(),
            };
            args.push("-f".to_string());
            args.push(selector);
            args.push("--merge-output-format".to_string());
            args.push(VIDEO_CONTAINER.to_string());
        }
    }

    args.push(url.to_string());
    args
}
