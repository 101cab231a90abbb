use indexmap::map::Entry;
use thiserror::Error;

use crate::helper::resolver::GroupKey;
use crate::helper::tree::{AlignmentTree, GroupNode, ReferenceNode};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("Reference {reference} in group {group} has length {left} on one side and {right} on the other")]
    ReferenceLengthConflict {
        group: String,
        reference: String,
        left: u64,
        right: u64,
    },
    #[error("Groups {existing:?} and {new:?} would both be reported as {name}")]
    GroupNameCollision {
        name: String,
        existing: GroupKey,
        new: GroupKey,
    },
}

impl AlignmentTree {
    /// Folds `other` into `self`: union of groups and references, with counters
    /// and distributions summed where both sides hold the same node.
    ///
    /// Only raw state is combined. Summaries must be derived again afterwards.
    /// Nothing is changed when the trees conflict.
    pub fn merge(&mut self, other: AlignmentTree) -> Result<(), MergeError> {
        self.check_compatible(&other)?;

        let (their_stats, their_tally, their_skipped, their_groups) = other.into_parts();
        let (stats, tally, skipped, groups) = self.parts_mut();
        stats.merge(&their_stats);
        tally.merge(&their_tally);
        *skipped += their_skipped;

        for (key, group) in their_groups {
            match groups.entry(key) {
                Entry::Occupied(mut entry) => merge_group(entry.get_mut(), group),
                Entry::Vacant(entry) => {
                    entry.insert(group);
                }
            }
        }
        Ok(())
    }

    pub fn merged(mut self, other: AlignmentTree) -> Result<AlignmentTree, MergeError> {
        self.merge(other)?;
        Ok(self)
    }

    /// Left fold over any number of trees, starting from an empty one.
    pub fn merge_all<I>(trees: I) -> Result<AlignmentTree, MergeError>
    where
        I: IntoIterator<Item = AlignmentTree>,
    {
        trees
            .into_iter()
            .try_fold(AlignmentTree::new(), |acc, tree| acc.merged(tree))
    }

    fn check_compatible(&self, other: &AlignmentTree) -> Result<(), MergeError> {
        for (key, theirs) in other.groups() {
            if let Some(existing) = self.group_named_like(key) {
                return Err(MergeError::GroupNameCollision {
                    name: key.to_string(),
                    existing: existing.clone(),
                    new: key.clone(),
                });
            }
            let Some(ours) = self.group(key) else {
                continue;
            };
            for (name, their_ref) in theirs.references() {
                if let Some(our_ref) = ours.reference(name) {
                    check_reference(key, our_ref, their_ref)?;
                }
            }
        }
        Ok(())
    }
}

fn check_reference(key: &GroupKey, ours: &ReferenceNode, theirs: &ReferenceNode) -> Result<(), MergeError> {
    let (left, right) = (ours.length(), theirs.length());
    // 0 means the length was unknown when the node was created
    if left != 0 && right != 0 && left != right {
        return Err(MergeError::ReferenceLengthConflict {
            group: key.to_string(),
            reference: ours.name().clone(),
            left,
            right,
        });
    }
    Ok(())
}

fn merge_group(ours: &mut GroupNode, theirs: GroupNode) {
    let (_, their_stats, their_tally, their_references) = theirs.into_parts();
    let (stats, tally, references) = ours.parts_mut();
    stats.merge(&their_stats);
    tally.merge(&their_tally);

    for (name, reference) in their_references {
        match references.entry(name) {
            Entry::Occupied(mut entry) => {
                let node = entry.get_mut();
                if node.length() == 0 {
                    node.set_length(reference.length());
                }
                node.stats_mut().merge(reference.stats());
            }
            Entry::Vacant(entry) => {
                entry.insert(reference);
            }
        }
    }
}
