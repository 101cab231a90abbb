use std::collections::BTreeMap;
use std::path::Path;

use indicatif::{MultiProgress, ProgressBar};
use log::{info, warn};
use rayon::prelude::*;

use crate::config::{OutputFormat, RunConfig};
use crate::helper::catalog::ReferenceCatalog;
use crate::helper::error::MapulaError;
use crate::helper::io::record_reader;
use crate::helper::record::AlignmentRecord;
use crate::helper::resolver::GroupKeyResolver;
use crate::helper::snapshot::Snapshot;
use crate::helper::summary::Summary;
use crate::helper::tree::{AlignmentTree, Ingested};
use crate::pipelines::progress::spinner;
use crate::pipelines::write_summaries;

/// Builds a tree from every input table and adds it to the snapshot at
/// `snapshot_path`, creating the snapshot when it does not exist yet.
pub fn count(config: &RunConfig, snapshot_path: &Path, format: OutputFormat) -> Result<Summary, MapulaError> {
    if config.inputs.is_empty() {
        return Err(MapulaError::NoInputFiles);
    }

    let catalog = ReferenceCatalog::from_paths(&config.reference_files, config.expected_counts.as_deref())?;
    info!(
        "Loaded {} references and {} expected counts",
        catalog.len(),
        catalog.expected_counts().len()
    );
    let resolver = GroupKeyResolver::new(&catalog, config.unknown_reference_policy);

    let progress = MultiProgress::new();
    let partials = config
        .inputs
        .par_iter()
        .map(|path| {
            let bar = progress.add(spinner(&path.display().to_string()));
            let result = count_file(path, &resolver, &bar);
            bar.finish();
            result
        })
        .collect::<Result<Vec<_>, MapulaError>>()?;

    let mut snapshot = if snapshot_path.exists() {
        info!("Extending existing snapshot {}", snapshot_path.display());
        Snapshot::load(snapshot_path)?
    } else {
        Snapshot::new(config.clone())
    };
    for (tree, skipped) in partials {
        snapshot.merge(Snapshot::from_tree(config.clone(), tree, skipped))?;
    }

    snapshot.write(snapshot_path)?;
    info!("Snapshot written to {}", snapshot_path.display());

    let summary = snapshot.summarize(&catalog);
    write_summaries(&summary, snapshot_path, format)?;
    Ok(summary)
}

/// One input table into a fresh tree, plus skip counts by cause.
/// Log lines go through `bar.suspend`, which hides every bar of its `MultiProgress` while they print.
pub fn count_file(
    path: &Path,
    resolver: &GroupKeyResolver,
    bar: &ProgressBar,
) -> Result<(AlignmentTree, BTreeMap<String, u64>), MapulaError> {
    let mut tree = AlignmentTree::new();
    let mut skipped = BTreeMap::new();
    let mut reader = record_reader(path)?;

    for (line, result) in reader.deserialize::<AlignmentRecord>().enumerate() {
        let record = result?;
        if let Ingested::Skipped(e) = tree.add_record(&record, resolver)? {
            // line 1 is the header
            bar.suspend(|| warn!("{}:{}: skipping record: {}", path.display(), line + 2, e));
            *skipped.entry(e.reason()).or_insert(0) += 1;
        }
        bar.inc(1);
    }

    bar.suspend(|| {
        info!(
            "{}: {} alignments, {} skipped",
            path.display(),
            tree.stats().counters().alignment_count(),
            tree.skipped_records()
        )
    });
    Ok((tree, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::error::MapulaError;
    use crate::helper::resolver::{ClassificationError, GroupKey, UnknownReferencePolicy};
    use crate::helper::summary::TOTAL;
    use std::path::PathBuf;

    fn config(inputs: &[&str]) -> RunConfig {
        RunConfig {
            reference_files: vec![PathBuf::from("tests/data/ERCC.fasta"), PathBuf::from("tests/data/Host.fasta")],
            expected_counts: Some(PathBuf::from("tests/data/expected_counts.csv")),
            unknown_reference_policy: UnknownReferencePolicy::Fallback,
            inputs: inputs.iter().map(PathBuf::from).collect(),
        }
    }

    #[test]
    fn test_count_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.mapula.json");

        let summary = count(&config(&["tests/data/records.csv"]), &path, OutputFormat::All).unwrap();

        assert_eq!(summary.group, TOTAL);
        assert_eq!(summary.alignment_count, 9);
        assert_eq!(summary.skipped_records, Some(1));
        assert_eq!(summary.secondary_count, 1);
        assert_eq!(summary.supplementary_count, 1);
        assert_eq!(summary.unmapped_count, 1);
        assert!(summary.children.contains_key("ERCC-run1-barcode01"));
        assert!(summary.children.contains_key("Host-run1-barcode02"));
        assert!(summary.children.contains_key("ERCC-unknown-unclassified"));
        assert!(summary.children.contains_key("Unmapped-run1-barcode01"));
        assert_eq!(summary.children.len(), 5);

        assert!(path.exists());
        assert!(dir.path().join("stats.mapula.summary.json").exists());
        assert!(dir.path().join("stats.mapula.summary.csv").exists());
    }

    #[test]
    fn test_gz_and_plain_inputs_agree() {
        let dir = tempfile::tempdir().unwrap();
        let plain = count(
            &config(&["tests/data/records.csv"]),
            &dir.path().join("plain.json"),
            OutputFormat::Json,
        )
        .unwrap();
        let gz = count(
            &config(&["tests/data/records.tsv.gz"]),
            &dir.path().join("gz.json"),
            OutputFormat::Json,
        )
        .unwrap();
        assert_eq!(plain, gz);
    }

    #[test]
    fn test_count_extends_existing_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.mapula.json");

        let once = count(&config(&["tests/data/records.csv"]), &path, OutputFormat::Json).unwrap();
        let twice = count(&config(&["tests/data/records.tsv.gz"]), &path, OutputFormat::Json).unwrap();

        assert_eq!(twice.alignment_count, 2 * once.alignment_count);
        assert_eq!(twice.skipped_records, Some(2));
        let snapshot = Snapshot::load(&path).unwrap();
        assert_eq!(snapshot.config().inputs.len(), 2);
        assert_eq!(snapshot.skipped().get("negative_read_length"), Some(&2));
    }

    #[test]
    fn test_parallel_inputs_match_sequential_counts() {
        let dir = tempfile::tempdir().unwrap();
        let both = count(
            &config(&["tests/data/records.csv", "tests/data/records.tsv.gz"]),
            &dir.path().join("both.json"),
            OutputFormat::Json,
        )
        .unwrap();

        let catalog = ReferenceCatalog::from_paths(
            &config(&[]).reference_files,
            Some(Path::new("tests/data/expected_counts.csv")),
        )
        .unwrap();
        let resolver = GroupKeyResolver::new(&catalog, UnknownReferencePolicy::Fallback);
        let (mut tree, _) = count_file(Path::new("tests/data/records.csv"), &resolver, &ProgressBar::hidden()).unwrap();
        let (other, _) = count_file(Path::new("tests/data/records.tsv.gz"), &resolver, &ProgressBar::hidden()).unwrap();
        tree.merge(other).unwrap();

        assert_eq!(both, tree.summarize(&catalog));
        let ercc = tree.group(&GroupKey::new("ERCC", "run1", "barcode01")).unwrap();
        assert_eq!(ercc.reference("ERCC-00003").unwrap().length(), 80);
    }

    #[test]
    fn test_unknown_reference_fails_without_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&["tests/data/records.csv"]);
        config.reference_files = vec![PathBuf::from("tests/data/ERCC.fasta")];
        config.unknown_reference_policy = UnknownReferencePolicy::Fail;
        let path = dir.path().join("stats.mapula.json");

        let result = count(&config, &path, OutputFormat::Json);
        assert!(matches!(
            result,
            Err(MapulaError::Classification(ClassificationError::UnknownReference(ref name))) if name == "chr1"
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_no_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let result = count(&config(&[]), &dir.path().join("s.json"), OutputFormat::Json);
        assert!(matches!(result, Err(MapulaError::NoInputFiles)));
    }

    #[test]
    fn test_count_file_under_multi_progress() {
        use indicatif::ProgressDrawTarget;

        let catalog = ReferenceCatalog::from_paths(&config(&[]).reference_files, None).unwrap();
        let resolver = GroupKeyResolver::new(&catalog, UnknownReferencePolicy::Fallback);
        let progress = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let bar = progress.add(ProgressBar::new_spinner());

        let (tree, skipped) = count_file(Path::new("tests/data/records.csv"), &resolver, &bar).unwrap();
        assert_eq!(bar.position(), 10);
        assert_eq!(skipped.get("negative_read_length"), Some(&1));
        assert_eq!(tree.skipped_records(), 1);
        assert_eq!(tree.check_consistency(), Ok(()));
    }
}
