use indexmap::IndexMap;
use serde::Serialize;

use crate::helper::correlation::Correlation;
use crate::helper::stats::{CoreStats, ReferenceTally};

pub const TOTAL: &str = "total";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationSummary {
    pub spearmans_rho: f64,
    pub spearmans_rho_pvalue: Option<f64>,
}

impl From<Correlation> for CorrelationSummary {
    fn from(correlation: Correlation) -> Self {
        CorrelationSummary {
            spearmans_rho: correlation.rho(),
            spearmans_rho_pvalue: correlation.p_value(),
        }
    }
}

/// Scalar view of one node, derived from its distributions on every call.
/// Fields that only exist for groups and the root are left out for references.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub group: String,
    pub run_id: String,
    pub barcode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_length: Option<u64>,
    pub alignment_count: u64,
    pub read_count: u64,
    pub primary_count: u64,
    pub secondary_count: u64,
    pub supplementary_count: u64,
    pub unmapped_count: u64,
    pub base_pairs: u64,
    pub observed_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_observed_references: Option<usize>,
    pub coverage80_count: u64,
    pub coverage80_percent: f64,
    pub median_accuracy: Option<f64>,
    pub median_quality: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n50: Option<u64>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub correlation: Option<CorrelationSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_records: Option<u64>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub children: IndexMap<String, Summary>,
}

impl Summary {
    /// Reference-level summary: no N50, no reference tally, no correlation.
    pub fn from_stats(group: &str, run_id: &str, barcode: &str, stats: &CoreStats) -> Self {
        let counters = stats.counters();
        Summary {
            group: group.to_string(),
            run_id: run_id.to_string(),
            barcode: barcode.to_string(),
            reference: None,
            reference_length: None,
            alignment_count: counters.alignment_count(),
            read_count: counters.read_count(),
            primary_count: counters.primary_count(),
            secondary_count: counters.secondary_count(),
            supplementary_count: counters.supplementary_count(),
            unmapped_count: counters.unmapped_count(),
            base_pairs: counters.total_base_pairs(),
            observed_count: counters.read_count(),
            unique_observed_references: None,
            coverage80_count: stats.coverage80_count(),
            coverage80_percent: stats.coverage80_percent(),
            median_accuracy: stats.median_accuracy(),
            median_quality: stats.median_quality(),
            n50: None,
            correlation: None,
            skipped_records: None,
            children: IndexMap::new(),
        }
    }

    /// Adds the group/root-only fields.
    pub fn with_tally(mut self, stats: &CoreStats, tally: &ReferenceTally, correlation: Correlation) -> Self {
        self.unique_observed_references = Some(tally.unique_observed_references());
        self.n50 = Some(stats.n50().unwrap_or(0));
        self.correlation = Some(correlation.into());
        self
    }
}

/// One line of the flattened CSV summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub level: &'static str,
    pub group: String,
    pub run_id: String,
    pub barcode: String,
    pub reference: Option<String>,
    pub reference_length: Option<u64>,
    pub alignment_count: u64,
    pub read_count: u64,
    pub primary_count: u64,
    pub secondary_count: u64,
    pub supplementary_count: u64,
    pub unmapped_count: u64,
    pub base_pairs: u64,
    pub observed_count: u64,
    pub unique_observed_references: Option<usize>,
    pub coverage80_count: u64,
    pub coverage80_percent: f64,
    pub median_accuracy: Option<f64>,
    pub median_quality: Option<f64>,
    pub n50: Option<u64>,
    pub spearmans_rho: Option<f64>,
    pub spearmans_rho_pvalue: Option<f64>,
}

impl SummaryRow {
    fn from_summary(level: &'static str, summary: &Summary) -> Self {
        SummaryRow {
            level,
            group: summary.group.clone(),
            run_id: summary.run_id.clone(),
            barcode: summary.barcode.clone(),
            reference: summary.reference.clone(),
            reference_length: summary.reference_length,
            alignment_count: summary.alignment_count,
            read_count: summary.read_count,
            primary_count: summary.primary_count,
            secondary_count: summary.secondary_count,
            supplementary_count: summary.supplementary_count,
            unmapped_count: summary.unmapped_count,
            base_pairs: summary.base_pairs,
            observed_count: summary.observed_count,
            unique_observed_references: summary.unique_observed_references,
            coverage80_count: summary.coverage80_count,
            coverage80_percent: summary.coverage80_percent,
            median_accuracy: summary.median_accuracy,
            median_quality: summary.median_quality,
            n50: summary.n50,
            spearmans_rho: summary.correlation.as_ref().map(|c| c.spearmans_rho),
            spearmans_rho_pvalue: summary.correlation.as_ref().and_then(|c| c.spearmans_rho_pvalue),
        }
    }

    /// Root first, then each group followed by its references.
    pub fn flatten(root: &Summary) -> Vec<SummaryRow> {
        let mut rows = vec![SummaryRow::from_summary("total", root)];
        for group in root.children.values() {
            rows.push(SummaryRow::from_summary("group", group));
            for reference in group.children.values() {
                rows.push(SummaryRow::from_summary("reference", reference));
            }
        }
        rows
    }
}
