use thiserror::Error;

use crate::helper::distribution::DomainError;
use crate::helper::merge::MergeError;
use crate::helper::resolver::ClassificationError;
use crate::helper::tree::TreeError;

#[derive(Error, Debug)]
pub enum MapulaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to read table: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to parse snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid metric value: {0}")]
    Domain(#[from] DomainError),
    #[error("Classification failed: {0}")]
    Classification(#[from] ClassificationError),
    #[error("Merge failed: {0}")]
    Merge(#[from] MergeError),
    #[error("Invalid expected count for reference {0}: {1}")]
    InvalidExpectedCount(String, f64),
    #[error("Snapshot {0} was written by an incompatible version: {1}")]
    IncompatibleSnapshot(String, String),
    #[error("Snapshot {0} is inconsistent: {1}")]
    InconsistentSnapshot(String, TreeError),
    #[error("No input files given")]
    NoInputFiles,
}
