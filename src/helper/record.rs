use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::helper::distribution::{DomainError, PercentBucket};

pub const UNMAPPED: &str = "unmapped";
pub const UNKNOWN: &str = "unknown";
pub const UNCLASSIFIED: &str = "unclassified";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentRole {
    #[default]
    Primary,
    Secondary,
    Supplementary,
}

impl Display for AlignmentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlignmentRole::Primary => write!(f, "primary"),
            AlignmentRole::Secondary => write!(f, "secondary"),
            AlignmentRole::Supplementary => write!(f, "supplementary"),
        }
    }
}

/// One already-parsed alignment, as delivered by the record table reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentRecord {
    #[serde(default, alias = "reference_name")]
    pub reference: Option<String>,
    #[serde(default, alias = "RD")]
    pub run_id: Option<String>,
    #[serde(default, alias = "BC")]
    pub barcode: Option<String>,
    pub read_length: i64,
    pub accuracy: f64,
    pub quality: f64,
    #[serde(alias = "coverage_percent")]
    pub coverage: f64,
    #[serde(default)]
    pub role: AlignmentRole,
}

impl AlignmentRecord {
    pub fn new(reference: Option<&str>, read_length: i64, accuracy: f64, quality: f64, coverage: f64) -> Self {
        AlignmentRecord {
            reference: reference.map(str::to_string),
            run_id: None,
            barcode: None,
            read_length,
            accuracy,
            quality,
            coverage,
            role: AlignmentRole::Primary,
        }
    }

    pub fn with_run_id(mut self, run_id: &str) -> Self {
        self.run_id = Some(run_id.to_string());
        self
    }

    pub fn with_barcode(mut self, barcode: &str) -> Self {
        self.barcode = Some(barcode.to_string());
        self
    }

    pub fn with_role(mut self, role: AlignmentRole) -> Self {
        self.role = role;
        self
    }

    /// `None` for unmapped records: no reference, an empty one, `*` or the `unmapped` sentinel.
    pub fn reference_name(&self) -> Option<&str> {
        match self.reference.as_deref().map(str::trim) {
            None | Some("") | Some("*") | Some(UNMAPPED) => None,
            Some(name) => Some(name),
        }
    }

    pub fn is_unmapped(&self) -> bool {
        self.reference_name().is_none()
    }

    pub fn run_id(&self) -> &str {
        non_empty(self.run_id.as_deref()).unwrap_or(UNKNOWN)
    }

    pub fn barcode(&self) -> &str {
        non_empty(self.barcode.as_deref()).unwrap_or(UNCLASSIFIED)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// The metric part of a record once every value has been checked against its domain.
/// Building one never touches any counter, so a rejected record leaves the tree untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub role: AlignmentRole,
    pub mapped: bool,
    pub read_length: u64,
    pub accuracy: PercentBucket,
    pub quality: PercentBucket,
    pub coverage: PercentBucket,
}

impl TryFrom<&AlignmentRecord> for Observation {
    type Error = DomainError;

    fn try_from(record: &AlignmentRecord) -> Result<Self, Self::Error> {
        let read_length = u64::try_from(record.read_length)
            .map_err(|_| DomainError::NegativeLength(record.read_length))?;
        Ok(Observation {
            role: record.role,
            mapped: !record.is_unmapped(),
            read_length,
            accuracy: PercentBucket::new("accuracy", record.accuracy)?,
            quality: PercentBucket::new("quality", record.quality)?,
            coverage: PercentBucket::new("coverage", record.coverage)?,
        })
    }
}
