use std::collections::BTreeMap;

use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};

use crate::helper::correlation::{Correlation, spearman};
use crate::helper::distribution::{LengthDistribution, PercentDistribution};
use crate::helper::record::{AlignmentRole, Observation, UNMAPPED};

/// Alignments covering at least this share of their reference count towards coverage80.
pub const COVERAGE_THRESHOLD: f64 = 80.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Counters {
    alignment_count: u64,
    read_count: u64,
    primary_count: u64,
    secondary_count: u64,
    supplementary_count: u64,
    unmapped_count: u64,
    total_base_pairs: u64,
}

impl Counters {
    pub(crate) fn merge(&mut self, other: &Counters) {
        self.alignment_count += other.alignment_count;
        self.read_count += other.read_count;
        self.primary_count += other.primary_count;
        self.secondary_count += other.secondary_count;
        self.supplementary_count += other.supplementary_count;
        self.unmapped_count += other.unmapped_count;
        self.total_base_pairs = self.total_base_pairs.saturating_add(other.total_base_pairs);
    }
}

/// Counters and distributions kept at every level of the tree.
///
/// Alignment-level metrics (accuracy, coverage) are recorded for every mapped
/// alignment; read-level metrics (length, quality, base pairs) only for the
/// primary record of a read, so secondary and supplementary alignments do not
/// count a read twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[getset(get = "pub")]
pub struct CoreStats {
    counters: Counters,
    accuracy: PercentDistribution,
    quality: PercentDistribution,
    read_lengths: LengthDistribution,
    coverage: PercentDistribution,
}

impl CoreStats {
    pub fn new() -> Self {
        CoreStats::default()
    }

    pub fn observe(&mut self, observation: &Observation) {
        let counters = &mut self.counters;
        counters.alignment_count += 1;

        match observation.role {
            AlignmentRole::Primary => {
                counters.primary_count += 1;
                counters.read_count += 1;
                counters.total_base_pairs = counters.total_base_pairs.saturating_add(observation.read_length);
                self.read_lengths.add(observation.read_length);
                self.quality.add(observation.quality);
            }
            AlignmentRole::Secondary => counters.secondary_count += 1,
            AlignmentRole::Supplementary => counters.supplementary_count += 1,
        }

        if observation.mapped {
            self.accuracy.add(observation.accuracy);
            self.coverage.add(observation.coverage);
        } else {
            counters.unmapped_count += 1;
        }
    }

    pub fn merge(&mut self, other: &CoreStats) {
        self.counters.merge(&other.counters);
        self.accuracy.merge(&other.accuracy);
        self.quality.merge(&other.quality);
        self.read_lengths.merge(&other.read_lengths);
        self.coverage.merge(&other.coverage);
    }

    pub fn is_empty(&self) -> bool {
        self.counters.alignment_count == 0
    }

    /// Checks the relations between counters and distribution totals.
    pub fn is_consistent(&self) -> bool {
        let c = &self.counters;
        c.alignment_count == c.primary_count + c.secondary_count + c.supplementary_count
            && c.alignment_count == self.accuracy.total() + c.unmapped_count
            && self.accuracy.total() == self.coverage.total()
            && c.read_count == self.read_lengths.total()
            && c.read_count == self.quality.total()
            && c.total_base_pairs == self.read_lengths.total_bases()
    }

    pub fn median_accuracy(&self) -> Option<f64> {
        self.accuracy.median()
    }

    pub fn median_quality(&self) -> Option<f64> {
        self.quality.median()
    }

    pub fn coverage80_count(&self) -> u64 {
        self.coverage.count_at_or_above(COVERAGE_THRESHOLD)
    }

    pub fn coverage80_percent(&self) -> f64 {
        self.coverage.percent_at_or_above(COVERAGE_THRESHOLD)
    }

    pub fn n50(&self) -> Option<u64> {
        self.read_lengths.n50()
    }
}

/// Per-reference observed read counts for a group or the whole tree.
/// Every reference seen at least once has an entry, so the entry count is the
/// number of unique observed references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(transparent)]
pub struct ReferenceTally {
    #[getset(get = "pub")]
    observed: BTreeMap<String, u64>,
}

impl ReferenceTally {
    pub fn new() -> Self {
        ReferenceTally::default()
    }

    pub fn observe(&mut self, reference: &str, observation: &Observation) {
        if reference == UNMAPPED {
            return;
        }
        let count = self.observed.entry(reference.to_string()).or_insert(0);
        if observation.role == AlignmentRole::Primary {
            *count += 1;
        }
    }

    pub fn unique_observed_references(&self) -> usize {
        self.observed.len()
    }

    pub fn merge(&mut self, other: &ReferenceTally) {
        for (reference, count) in &other.observed {
            *self.observed.entry(reference.clone()).or_insert(0) += count;
        }
    }

    pub fn correlate(&self, expected: &BTreeMap<String, f64>) -> Correlation {
        spearman(&self.observed, expected)
    }
}
