use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Local};
use getset::Getters;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::helper::catalog::ReferenceCatalog;
use crate::helper::distribution::DomainError;
use crate::helper::error::MapulaError;
use crate::helper::json::{FromJsonString, write_json_pretty};
use crate::helper::summary::Summary;
use crate::helper::tree::AlignmentTree;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Persisted raw state of an aggregation run. Summaries are never stored,
/// they are derived from `tree` whenever they are needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[getset(get = "pub")]
pub struct Snapshot {
    version: String,
    created: DateTime<Local>,
    updated: DateTime<Local>,
    config: RunConfig,
    /// Skipped records by cause.
    #[serde(default)]
    skipped: BTreeMap<String, u64>,
    tree: AlignmentTree,
}

impl Snapshot {
    pub fn new(config: RunConfig) -> Self {
        let now = Local::now();
        Snapshot {
            version: VERSION.to_string(),
            created: now,
            updated: now,
            config,
            skipped: BTreeMap::new(),
            tree: AlignmentTree::new(),
        }
    }

    pub fn from_tree(config: RunConfig, tree: AlignmentTree, skipped: BTreeMap<String, u64>) -> Self {
        Snapshot {
            tree,
            skipped,
            ..Snapshot::new(config)
        }
    }

    pub fn load(path: &Path) -> Result<Self, MapulaError> {
        let snapshot = Snapshot::from_json_file(path)?;
        if major(&snapshot.version) != major(VERSION) {
            return Err(MapulaError::IncompatibleSnapshot(
                path.display().to_string(),
                snapshot.version,
            ));
        }
        snapshot
            .tree
            .check_consistency()
            .map_err(|e| MapulaError::InconsistentSnapshot(path.display().to_string(), e))?;
        debug!(
            "Loaded snapshot {} ({} groups, created {})",
            path.display(),
            snapshot.tree.groups().len(),
            snapshot.created
        );
        Ok(snapshot)
    }

    /// Stamps `updated` and writes the snapshot as pretty JSON.
    pub fn write(&mut self, path: &Path) -> Result<(), MapulaError> {
        self.updated = Local::now();
        self.version = VERSION.to_string();
        write_json_pretty(self, path)
    }

    pub fn config_mut(&mut self) -> &mut RunConfig {
        &mut self.config
    }

    pub fn record_skip(&mut self, error: &DomainError) {
        *self.skipped.entry(error.reason()).or_insert(0) += 1;
    }

    /// Merges trees, skip tallies and configurations. The tree is merged
    /// first, so a conflict leaves `self` untouched.
    pub fn merge(&mut self, other: Snapshot) -> Result<(), MapulaError> {
        self.tree.merge(other.tree)?;
        for (reason, count) in other.skipped {
            *self.skipped.entry(reason).or_insert(0) += count;
        }
        self.config.absorb(&other.config);
        self.created = self.created.min(other.created);
        Ok(())
    }

    pub fn summarize(&self, catalog: &ReferenceCatalog) -> Summary {
        self.tree.summarize(catalog)
    }
}

impl AlignmentTree {
    /// Serializable copy of the raw tree, distributions included.
    /// `skipped` holds the skip counts by cause gathered while the tree was built.
    pub fn snapshot(&self, config: RunConfig, skipped: BTreeMap<String, u64>) -> Snapshot {
        Snapshot::from_tree(config, self.clone(), skipped)
    }
}

fn major(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}
