use std::path::Path;

use log::info;

use crate::config::OutputFormat;
use crate::helper::error::MapulaError;
use crate::helper::io::{summary_path, write_summary_csv, write_summary_json};
use crate::helper::summary::Summary;

pub mod aggregate;
pub mod count;
pub mod progress;

/// Writes the derived summaries next to the snapshot in the requested formats.
pub fn write_summaries(summary: &Summary, snapshot_path: &Path, format: OutputFormat) -> Result<(), MapulaError> {
    if format.json() {
        let path = summary_path(snapshot_path, "json");
        write_summary_json(summary, &path)?;
        info!("Summary written to {}", path.display());
    }
    if format.csv() {
        let path = summary_path(snapshot_path, "csv");
        write_summary_csv(summary, &path)?;
        info!("Summary table written to {}", path.display());
    }
    Ok(())
}
