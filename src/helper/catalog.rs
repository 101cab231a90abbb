use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use bio::io::fasta;
use getset::Getters;
use log::{debug, warn};
use serde::Deserialize;

use crate::helper::error::MapulaError;
use crate::helper::io::open_maybe_gz;

#[derive(Debug, Clone, PartialEq, Getters)]
pub struct ReferenceInfo {
    #[getset(get = "pub")]
    group: String,
    #[getset(get = "pub")]
    length: u64,
}

/// Reference-set metadata: which reference group (FASTA file) every reference
/// name came from, its length, and the expected counts used for correlation.
#[derive(Debug, Clone, Default, Getters)]
pub struct ReferenceCatalog {
    references: HashMap<String, ReferenceInfo>,
    #[getset(get = "pub")]
    expected_counts: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct ExpectedCountRow {
    reference: String,
    expected_count: f64,
}

impl ReferenceCatalog {
    pub fn new() -> Self {
        ReferenceCatalog::default()
    }

    pub fn insert(&mut self, name: &str, group: &str, length: u64) {
        if let Some(previous) = self.references.get(name) {
            if previous.group != group {
                warn!(
                    "Reference {} appears in both {} and {}, keeping {}",
                    name, previous.group, group, group
                );
            }
        }
        self.references.insert(
            name.to_string(),
            ReferenceInfo {
                group: group.to_string(),
                length,
            },
        );
    }

    pub fn set_expected_count(&mut self, name: &str, count: f64) -> Result<(), MapulaError> {
        if !count.is_finite() || count < 0.0 {
            return Err(MapulaError::InvalidExpectedCount(name.to_string(), count));
        }
        self.expected_counts.insert(name.to_string(), count);
        Ok(())
    }

    /// Adds every sequence of a FASTA file under the group named after the file.
    pub fn load_fasta(&mut self, path: &Path) -> Result<usize, MapulaError> {
        let group = group_name_from_path(path);
        let reader = fasta::Reader::new(open_maybe_gz(path)?);
        let mut loaded = 0;
        for record in reader.records() {
            let record = record?;
            self.insert(record.id(), &group, record.seq().len() as u64);
            loaded += 1;
        }
        debug!("Loaded {} references for group {} from {}", loaded, group, path.display());
        Ok(loaded)
    }

    /// Reads a `reference,expected_count` table.
    pub fn load_expected_counts(&mut self, path: &Path) -> Result<usize, MapulaError> {
        let mut reader = csv::Reader::from_reader(open_maybe_gz(path)?);
        let mut loaded = 0;
        for row in reader.deserialize() {
            let row: ExpectedCountRow = row?;
            self.set_expected_count(row.reference.trim(), row.expected_count)?;
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn from_paths<P: AsRef<Path>>(
        fasta_paths: &[P],
        expected_counts: Option<&Path>,
    ) -> Result<Self, MapulaError> {
        let mut catalog = ReferenceCatalog::new();
        for path in fasta_paths {
            catalog.load_fasta(path.as_ref())?;
        }
        if let Some(path) = expected_counts {
            catalog.load_expected_counts(path)?;
        }
        Ok(catalog)
    }

    pub fn get(&self, name: &str) -> Option<&ReferenceInfo> {
        self.references.get(name)
    }

    pub fn group_of(&self, name: &str) -> Option<&str> {
        self.references.get(name).map(|info| info.group.as_str())
    }

    pub fn length_of(&self, name: &str) -> Option<u64> {
        self.references.get(name).map(|info| info.length)
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// Expected counts restricted to the references the catalog assigns to `group`.
    pub fn expected_counts_for_group(&self, group: &str) -> BTreeMap<String, f64> {
        self.expected_counts
            .iter()
            .filter(|(name, _)| self.group_of(name) == Some(group))
            .map(|(name, count)| (name.clone(), *count))
            .collect()
    }
}

/// `refs/ERCC.fasta.gz` -> `ERCC`
pub fn group_name_from_path(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let trimmed = file_name.strip_suffix(".gz").unwrap_or(&file_name);
    match trimmed.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_name_from_path() {
        assert_eq!(group_name_from_path(Path::new("refs/ERCC.fasta")), "ERCC");
        assert_eq!(group_name_from_path(Path::new("Host.fa.gz")), "Host");
        assert_eq!(group_name_from_path(Path::new("genome")), "genome");
    }

    #[test]
    fn test_load_fasta_and_expected_counts() {
        let catalog = ReferenceCatalog::from_paths(
            &["tests/data/ERCC.fasta", "tests/data/Host.fasta"],
            Some(Path::new("tests/data/expected_counts.csv")),
        )
        .unwrap();

        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.group_of("ERCC-00002"), Some("ERCC"));
        assert_eq!(catalog.group_of("chr1"), Some("Host"));
        assert_eq!(catalog.length_of("ERCC-00002"), Some(60));
        assert_eq!(catalog.group_of("missing"), None);
        assert_eq!(catalog.expected_counts().len(), 3);
        assert_eq!(catalog.expected_counts_for_group("ERCC").len(), 3);
        assert!(catalog.expected_counts_for_group("Host").is_empty());
    }

    #[test]
    fn test_negative_expected_count_is_rejected() {
        let mut catalog = ReferenceCatalog::new();
        assert!(catalog.set_expected_count("ERCC-00002", -1.0).is_err());
        assert!(catalog.set_expected_count("ERCC-00002", 12.5).is_ok());
    }
}
