use std::collections::HashSet;

use getset::{CopyGetters, Getters};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::helper::catalog::ReferenceCatalog;
use crate::helper::distribution::DomainError;
use crate::helper::record::{AlignmentRecord, Observation};
use crate::helper::resolver::{ClassificationError, GroupKey, GroupKeyResolver};
use crate::helper::stats::{CoreStats, Counters, ReferenceTally};
use crate::helper::summary::{Summary, TOTAL};

/// Raw state that no sequence of records and merges could have produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("counters of {0} disagree with its distributions")]
    InconsistentNode(String),
    #[error("counters of {0} differ from the sum of its children")]
    ChildTotalsMismatch(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, CopyGetters)]
pub struct ReferenceNode {
    #[getset(get = "pub")]
    name: String,
    /// 0 when the reference is missing from the catalog.
    #[getset(get_copy = "pub")]
    length: u64,
    #[getset(get = "pub")]
    stats: CoreStats,
}

impl ReferenceNode {
    pub fn new(name: &str, length: u64) -> Self {
        ReferenceNode {
            name: name.to_string(),
            length,
            stats: CoreStats::new(),
        }
    }

    pub(crate) fn stats_mut(&mut self) -> &mut CoreStats {
        &mut self.stats
    }

    pub(crate) fn set_length(&mut self, length: u64) {
        self.length = length;
    }

    pub fn derive_summary(&self, key: &GroupKey) -> Summary {
        let mut summary = Summary::from_stats(&key.group, &key.run_id, &key.barcode, &self.stats);
        summary.reference = Some(self.name.clone());
        summary.reference_length = Some(self.length);
        summary
    }
}

/// All alignments of one (reference group, run, barcode) combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[getset(get = "pub")]
pub struct GroupNode {
    key: GroupKey,
    stats: CoreStats,
    tally: ReferenceTally,
    references: IndexMap<String, ReferenceNode>,
}

impl GroupNode {
    pub fn new(key: GroupKey) -> Self {
        GroupNode {
            key,
            stats: CoreStats::new(),
            tally: ReferenceTally::new(),
            references: IndexMap::new(),
        }
    }

    pub fn get_or_create_reference(&mut self, name: &str, length: u64) -> &mut ReferenceNode {
        self.references
            .entry(name.to_string())
            .or_insert_with(|| ReferenceNode::new(name, length))
    }

    pub fn reference(&self, name: &str) -> Option<&ReferenceNode> {
        self.references.get(name)
    }

    pub fn unique_observed_references(&self) -> usize {
        self.tally.unique_observed_references()
    }

    fn observe(&mut self, reference: &str, length: u64, observation: &Observation) {
        self.stats.observe(observation);
        self.tally.observe(reference, observation);
        self.get_or_create_reference(reference, length)
            .stats_mut()
            .observe(observation);
    }

    pub(crate) fn parts_mut(
        &mut self,
    ) -> (&mut CoreStats, &mut ReferenceTally, &mut IndexMap<String, ReferenceNode>) {
        (&mut self.stats, &mut self.tally, &mut self.references)
    }

    pub(crate) fn into_parts(
        self,
    ) -> (GroupKey, CoreStats, ReferenceTally, IndexMap<String, ReferenceNode>) {
        (self.key, self.stats, self.tally, self.references)
    }

    pub fn check_consistency(&self) -> Result<(), TreeError> {
        let name = self.key.to_string();
        if !self.stats.is_consistent() {
            return Err(TreeError::InconsistentNode(name));
        }
        let mut children = Counters::default();
        for reference in self.references.values() {
            if !reference.stats.is_consistent() {
                return Err(TreeError::InconsistentNode(format!("{}/{}", name, reference.name)));
            }
            children.merge(reference.stats.counters());
        }
        if &children != self.stats.counters() {
            return Err(TreeError::ChildTotalsMismatch(name));
        }
        Ok(())
    }

    pub fn derive_summary(&self, catalog: &ReferenceCatalog) -> Summary {
        let expected = catalog.expected_counts_for_group(&self.key.group);
        let mut summary = Summary::from_stats(
            &self.key.group,
            &self.key.run_id,
            &self.key.barcode,
            &self.stats,
        )
        .with_tally(&self.stats, &self.tally, self.tally.correlate(&expected));

        for (name, reference) in &self.references {
            summary
                .children
                .insert(name.clone(), reference.derive_summary(&self.key));
        }
        summary
    }
}

/// What happened to a record handed to [`AlignmentTree::add_record`].
#[derive(Debug, Clone, PartialEq)]
pub enum Ingested {
    Added,
    /// A metric was out of range; the record was counted as skipped and nothing else changed.
    Skipped(DomainError),
}

/// Root of the global -> group -> reference hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Getters, CopyGetters)]
pub struct AlignmentTree {
    #[getset(get = "pub")]
    stats: CoreStats,
    #[getset(get = "pub")]
    tally: ReferenceTally,
    #[getset(get_copy = "pub")]
    #[serde(default)]
    skipped_records: u64,
    #[getset(get = "pub")]
    #[serde(serialize_with = "groups_as_list", deserialize_with = "groups_from_list")]
    groups: IndexMap<GroupKey, GroupNode>,
}

impl AlignmentTree {
    pub fn new() -> Self {
        AlignmentTree::default()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty() && self.skipped_records == 0
    }

    /// Routes one record into the root, its group and its reference, in that order.
    ///
    /// Validation and classification both happen before anything is updated, so
    /// a failing record never leaves the tree half updated.
    pub fn add_record(
        &mut self,
        record: &AlignmentRecord,
        resolver: &GroupKeyResolver,
    ) -> Result<Ingested, ClassificationError> {
        let (key, reference) = resolver.resolve(record)?;
        self.check_group_name(&key)?;
        let observation = match Observation::try_from(record) {
            Ok(observation) => observation,
            Err(e) => {
                self.skipped_records += 1;
                return Ok(Ingested::Skipped(e));
            }
        };
        let length = resolver.catalog().length_of(&reference).unwrap_or(0);

        self.stats.observe(&observation);
        self.tally.observe(&reference, &observation);
        self.get_or_create_group(key)?
            .observe(&reference, length, &observation);
        Ok(Ingested::Added)
    }

    /// Fails when a different key already renders to the same group name.
    pub fn get_or_create_group(&mut self, key: GroupKey) -> Result<&mut GroupNode, ClassificationError> {
        self.check_group_name(&key)?;
        Ok(self
            .groups
            .entry(key)
            .or_insert_with_key(|key| GroupNode::new(key.clone())))
    }

    pub fn get_or_create_reference(
        &mut self,
        key: GroupKey,
        name: &str,
        length: u64,
    ) -> Result<&mut ReferenceNode, ClassificationError> {
        Ok(self.get_or_create_group(key)?.get_or_create_reference(name, length))
    }

    /// Existing group, other than `key` itself, whose name equals `key`'s.
    pub fn group_named_like(&self, key: &GroupKey) -> Option<&GroupKey> {
        if self.groups.contains_key(key) {
            return None;
        }
        let name = key.to_string();
        self.groups.keys().find(|existing| existing.to_string() == name)
    }

    fn check_group_name(&self, key: &GroupKey) -> Result<(), ClassificationError> {
        match self.group_named_like(key) {
            Some(existing) => Err(ClassificationError::GroupNameCollision {
                name: key.to_string(),
                existing: existing.clone(),
                new: key.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn group(&self, key: &GroupKey) -> Option<&GroupNode> {
        self.groups.get(key)
    }

    pub(crate) fn parts_mut(
        &mut self,
    ) -> (
        &mut CoreStats,
        &mut ReferenceTally,
        &mut u64,
        &mut IndexMap<GroupKey, GroupNode>,
    ) {
        (
            &mut self.stats,
            &mut self.tally,
            &mut self.skipped_records,
            &mut self.groups,
        )
    }

    pub(crate) fn into_parts(
        self,
    ) -> (CoreStats, ReferenceTally, u64, IndexMap<GroupKey, GroupNode>) {
        (self.stats, self.tally, self.skipped_records, self.groups)
    }

    /// Checks counters against distributions on every node, and every
    /// parent's counters against the sum of its children.
    pub fn check_consistency(&self) -> Result<(), TreeError> {
        if !self.stats.is_consistent() {
            return Err(TreeError::InconsistentNode(TOTAL.to_string()));
        }
        let mut children = Counters::default();
        for group in self.groups.values() {
            group.check_consistency()?;
            children.merge(group.stats().counters());
        }
        if &children != self.stats.counters() {
            return Err(TreeError::ChildTotalsMismatch(TOTAL.to_string()));
        }
        Ok(())
    }

    /// Derives the nested summary fresh from the current distributions.
    pub fn summarize(&self, catalog: &ReferenceCatalog) -> Summary {
        let mut summary = Summary::from_stats(TOTAL, TOTAL, TOTAL, &self.stats).with_tally(
            &self.stats,
            &self.tally,
            self.tally.correlate(catalog.expected_counts()),
        );
        summary.skipped_records = Some(self.skipped_records);

        for (key, group) in &self.groups {
            summary
                .children
                .insert(key.to_string(), group.derive_summary(catalog));
        }
        summary
    }
}

fn groups_as_list<S>(groups: &IndexMap<GroupKey, GroupNode>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(groups.values())
}

fn groups_from_list<'de, D>(deserializer: D) -> Result<IndexMap<GroupKey, GroupNode>, D::Error>
where
    D: Deserializer<'de>,
{
    let list: Vec<GroupNode> = Vec::deserialize(deserializer)?;
    let mut groups = IndexMap::with_capacity(list.len());
    let mut names = HashSet::with_capacity(list.len());
    for group in list {
        if let Some(reference) = group
            .references
            .iter()
            .find(|(name, node)| *name != node.name())
        {
            return Err(serde::de::Error::custom(format!(
                "reference entry {} holds a node named {}",
                reference.0,
                reference.1.name()
            )));
        }
        let name = group.key.to_string();
        if !names.insert(name.clone()) {
            return Err(serde::de::Error::custom(format!("duplicate group {}", name)));
        }
        groups.insert(group.key.clone(), group);
    }
    Ok(groups)
}
