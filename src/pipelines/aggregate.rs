use std::path::{Path, PathBuf};

use log::info;

use crate::config::OutputFormat;
use crate::helper::catalog::ReferenceCatalog;
use crate::helper::error::MapulaError;
use crate::helper::snapshot::Snapshot;
use crate::helper::summary::Summary;
use crate::pipelines::write_summaries;

/// `merged` -> `merged.stats.mapula.json`
pub fn merged_snapshot_path(prefix: &str) -> PathBuf {
    PathBuf::from(format!("{}.{}", prefix, crate::config::DEFAULT_SNAPSHOT))
}

/// Combines snapshots from separate runs into one and writes it with its summaries.
pub fn aggregate(
    snapshot_paths: &[PathBuf],
    reference_files: &[PathBuf],
    expected_counts: Option<&Path>,
    output: &Path,
    format: OutputFormat,
) -> Result<Summary, MapulaError> {
    let Some((first, rest)) = snapshot_paths.split_first() else {
        return Err(MapulaError::NoInputFiles);
    };
    let catalog = ReferenceCatalog::from_paths(reference_files, expected_counts)?;

    let mut merged = Snapshot::load(first)?;
    for path in rest {
        merged.merge(Snapshot::load(path)?)?;
    }
    info!(
        "Merged {} snapshots into {} groups",
        snapshot_paths.len(),
        merged.tree().groups().len()
    );

    let config = merged.config_mut();
    config.reference_files = reference_files.to_vec();
    config.expected_counts = expected_counts.map(Path::to_path_buf);

    merged.write(output)?;
    info!("Merged snapshot written to {}", output.display());

    let summary = merged.summarize(&catalog);
    write_summaries(&summary, output, format)?;
    Ok(summary)
}
