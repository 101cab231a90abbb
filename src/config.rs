use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::helper::resolver::UnknownReferencePolicy;

pub const DEFAULT_SNAPSHOT: &str = "stats.mapula.json";
pub const DEFAULT_MERGED_PREFIX: &str = "merged";

/// Which summaries are written next to the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
    All,
}

impl OutputFormat {
    pub fn json(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::All)
    }

    pub fn csv(&self) -> bool {
        matches!(self, OutputFormat::Csv | OutputFormat::All)
    }
}

/// Parameters of the run that produced a snapshot, stored inside it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub reference_files: Vec<PathBuf>,
    pub expected_counts: Option<PathBuf>,
    pub unknown_reference_policy: UnknownReferencePolicy,
    #[serde(default)]
    pub inputs: Vec<PathBuf>,
}

impl RunConfig {
    /// Extends this configuration with the inputs of another run.
    pub fn absorb(&mut self, other: &RunConfig) {
        for path in &other.inputs {
            if !self.inputs.contains(path) {
                self.inputs.push(path.clone());
            }
        }
        for path in &other.reference_files {
            if !self.reference_files.contains(path) {
                self.reference_files.push(path.clone());
            }
        }
        if self.expected_counts.is_none() {
            self.expected_counts = other.expected_counts.clone();
        }
    }
}
