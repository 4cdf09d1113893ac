//! Parser for yt-dlp progress-template output

use crate::types::ProgressSample;

/// Placeholder substituted when the speed or ETA field is empty
const UNKNOWN_FIELD: &str = "---";

/// Parse one line of process stdout into a progress sample
///
/// yt-dlp is invoked with a progress template that prints three
/// pipe-separated fields per update: `<percent>%|<speed>|<eta>`. Everything
/// else on stdout is unrelated log output and yields `None`; noise lines
/// are silently ignored, never an error.
///
/// # Examples
///
/// ```
/// use media_dl::parse_progress_line;
///
/// let sample = parse_progress_line("45.2%|1.2MiB/s|00:05").unwrap();
/// assert_eq!(sample.percentage, 45.2);
/// assert_eq!(sample.speed, "1.2MiB/s");
/// assert_eq!(sample.eta, "00:05");
///
/// assert!(parse_progress_line("[download] Destination: clip.mp4").is_none());
/// ```
pub fn parse_progress_line(line: &str) -> Option<ProgressSample> {
    let fields: Vec<&str> = line.split('|').collect();
    if fields.len() != 3 {
        return None;
    }

    let percentage: f32 = fields[0].trim().trim_end_matches('%').trim().parse().ok()?;

    Some(ProgressSample {
        percentage,
        speed: field_or_placeholder(fields[1]),
        eta: field_or_placeholder(fields[2]),
    })
}

fn field_or_placeholder(field: &str) -> String {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        UNKNOWN_FIELD.to_string()
    } else {
        trimmed.to_string()
    }
}
