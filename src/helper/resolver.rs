use std::fmt::Display;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::helper::catalog::ReferenceCatalog;
use crate::helper::record::{AlignmentRecord, UNMAPPED};

pub const UNMAPPED_GROUP: &str = "Unmapped";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("Reference {0} is not present in any of the supplied reference sets")]
    UnknownReference(String),
    #[error("Groups {existing:?} and {new:?} would both be reported as {name}")]
    GroupNameCollision {
        name: String,
        existing: GroupKey,
        new: GroupKey,
    },
}

/// What to do with a record whose reference is missing from every reference set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UnknownReferencePolicy {
    /// Count it under the `Unmapped` group.
    #[default]
    Fallback,
    /// Stop with an error.
    Fail,
}

/// Identifies one group-level node: reference group, run and barcode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub group: String,
    pub run_id: String,
    pub barcode: String,
}

impl GroupKey {
    pub fn new(group: &str, run_id: &str, barcode: &str) -> Self {
        GroupKey {
            group: group.to_string(),
            run_id: run_id.to_string(),
            barcode: barcode.to_string(),
        }
    }
}

impl Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.group, self.run_id, self.barcode)
    }
}

/// Looks records up in the reference catalog. Holds no state of its own.
#[derive(Debug, Clone, Copy)]
pub struct GroupKeyResolver<'a> {
    catalog: &'a ReferenceCatalog,
    policy: UnknownReferencePolicy,
}

impl<'a> GroupKeyResolver<'a> {
    pub fn new(catalog: &'a ReferenceCatalog, policy: UnknownReferencePolicy) -> Self {
        GroupKeyResolver { catalog, policy }
    }

    pub fn catalog(&self) -> &'a ReferenceCatalog {
        self.catalog
    }

    pub fn resolve(&self, record: &AlignmentRecord) -> Result<(GroupKey, String), ClassificationError> {
        let (group, reference) = match record.reference_name() {
            None => (UNMAPPED_GROUP, UNMAPPED),
            Some(name) => match (self.catalog.group_of(name), self.policy) {
                (Some(group), _) => (group, name),
                (None, UnknownReferencePolicy::Fallback) => (UNMAPPED_GROUP, name),
                (None, UnknownReferencePolicy::Fail) => {
                    return Err(ClassificationError::UnknownReference(name.to_string()));
                }
            },
        };
        Ok((
            GroupKey::new(group, record.run_id(), record.barcode()),
            reference.to_string(),
        ))
    }
}
