//! Utility functions for time classification, log previews, and file system checks.

use chrono::{Local, NaiveTime, Timelike};
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Classify a wall-clock time into an edition name.
///
/// - **Morning**: 00:00 - 08:00
/// - **Afternoon**: 08:00 - 16:00
/// - **Evening**: 16:00 - 24:00
pub fn edition_for(time: NaiveTime) -> &'static str {
    match time.hour() {
        0..8 => "morning",
        8..16 => "afternoon",
        _ => "evening",
    }
}

/// Edition name for the current local time.
#[instrument]
pub fn time_of_day() -> String {
    let tod = Local::now().time();
    let which = edition_for(tod);
    tracing::debug!(%tod, %which, "Computed time_of_day");
    which.to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and a count of
/// the dropped characters appended.
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 chars)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{}…(+{} chars)", head, total - max)
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
