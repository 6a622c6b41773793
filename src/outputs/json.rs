//! JSON output for the downstream summarizer.
//!
//! Each run writes one pretty-printed array of [`ScrapedItem`]s, grouped by
//! local date and named after the edition (`morning`, `afternoon`, `evening`).

use crate::models::ScrapedItem;
use crate::utils::{ensure_writable_dir, time_of_day};
use chrono::Local;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `items` to `{json_output_dir}/{date}/{time_of_day}.json`.
///
/// Returns the path written.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_scraped(
    items: &[ScrapedItem],
    json_output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let local_date = Local::now().date_naive().to_string();
    write_scraped_edition(items, json_output_dir, &local_date, &time_of_day()).await
}

/// Write `items` to `{json_output_dir}/{local_date}/{edition}.json`.
pub async fn write_scraped_edition(
    items: &[ScrapedItem],
    json_output_dir: &str,
    local_date: &str,
    edition: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(items)?;

    let full_json_dir = PathBuf::from(json_output_dir).join(local_date);
    let dir_str = full_json_dir.to_string_lossy().to_string();
    if let Err(e) = ensure_writable_dir(&dir_str).await {
        error!(%dir_str, error = %e, "JSON directory is not writable");
        return Err(e);
    }

    let output_json_filename = full_json_dir.join(format!("{edition}.json"));
    fs::write(&output_json_filename, json).await?;
    info!(
        path = %output_json_filename.display(),
        count = items.len(),
        "Wrote scraped articles JSON"
    );

    Ok(output_json_filename)
}
