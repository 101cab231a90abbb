use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Percentages are binned at this many buckets per unit, so 0.0..=100.0 maps onto 0..=1000.
pub const PERCENT_RESOLUTION: f64 = 10.0;
pub const MAX_PERCENT_BUCKET: u16 = 1000;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("{0} value {1} is outside the range [0, 100]")]
    PercentOutOfRange(&'static str, f64),
    #[error("read length {0} is negative")]
    NegativeLength(i64),
    #[error("percentage bucket {0} is above 1000")]
    BucketOutOfRange(u16),
}

impl DomainError {
    /// Short label used to tally skipped records by cause.
    pub fn reason(&self) -> String {
        match self {
            DomainError::PercentOutOfRange(metric, _) => format!("{}_out_of_range", metric),
            DomainError::NegativeLength(_) => "negative_read_length".to_string(),
            DomainError::BucketOutOfRange(_) => "bucket_out_of_range".to_string(),
        }
    }
}

/// Ordered value -> observation count mapping shared by every tracker.
/// Every stored count is positive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "K: Ord + Deserialize<'de>"))]
pub struct Histogram<K: Ord> {
    #[serde(deserialize_with = "positive_counts")]
    counts: BTreeMap<K, u64>,
}

fn positive_counts<'de, D, K>(deserializer: D) -> Result<BTreeMap<K, u64>, D::Error>
where
    D: Deserializer<'de>,
    K: Ord + Deserialize<'de>,
{
    let counts = BTreeMap::<K, u64>::deserialize(deserializer)?;
    if counts.values().any(|count| *count == 0) {
        return Err(serde::de::Error::custom("histogram bucket with a zero count"));
    }
    Ok(counts)
}

impl<K: Ord + Copy> Histogram<K> {
    pub fn new() -> Self {
        Histogram {
            counts: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, key: K) {
        self.add_n(key, 1);
    }

    pub fn add_n(&mut self, key: K, n: u64) {
        if n > 0 {
            *self.counts.entry(key).or_insert(0) += n;
        }
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&K, &u64)> {
        self.counts.iter()
    }

    /// Key holding the lower of the two middle observations.
    pub fn median_key(&self) -> Option<K> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let target = (total - 1) / 2;
        let mut seen = 0;
        for (key, count) in &self.counts {
            seen += count;
            if seen > target {
                return Some(*key);
            }
        }
        None
    }

    pub fn count_at_or_above(&self, key: K) -> u64 {
        self.counts.range(key..).map(|(_, count)| count).sum()
    }

    pub fn merge(&mut self, other: &Histogram<K>) {
        for (key, count) in &other.counts {
            self.add_n(*key, *count);
        }
    }
}

/// A validated percentage, already discretized into its 0.1-wide bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PercentBucket(u16);

impl PercentBucket {
    pub fn new(metric: &'static str, value: f64) -> Result<Self, DomainError> {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Err(DomainError::PercentOutOfRange(metric, value));
        }
        // the small offset keeps values such as 80.3 out of the bucket below
        let bucket = ((value * PERCENT_RESOLUTION) + 1e-9).floor() as u16;
        Ok(PercentBucket(bucket.min(MAX_PERCENT_BUCKET)))
    }

    pub fn value(&self) -> f64 {
        self.0 as f64 / PERCENT_RESOLUTION
    }
}

/// Tracker for metrics bounded to [0, 100]: accuracy, quality and coverage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Histogram<u16>", into = "Histogram<u16>")]
pub struct PercentDistribution {
    histogram: Histogram<u16>,
}

impl TryFrom<Histogram<u16>> for PercentDistribution {
    type Error = DomainError;

    fn try_from(histogram: Histogram<u16>) -> Result<Self, Self::Error> {
        if let Some((&bucket, _)) = histogram.iter().next_back() {
            if bucket > MAX_PERCENT_BUCKET {
                return Err(DomainError::BucketOutOfRange(bucket));
            }
        }
        Ok(PercentDistribution { histogram })
    }
}

impl From<PercentDistribution> for Histogram<u16> {
    fn from(distribution: PercentDistribution) -> Self {
        distribution.histogram
    }
}

impl PercentDistribution {
    pub fn new() -> Self {
        PercentDistribution::default()
    }

    pub fn update(&mut self, metric: &'static str, value: f64) -> Result<(), DomainError> {
        let bucket = PercentBucket::new(metric, value)?;
        self.add(bucket);
        Ok(())
    }

    pub fn add(&mut self, bucket: PercentBucket) {
        self.histogram.add(bucket.0);
    }

    pub fn total(&self) -> u64 {
        self.histogram.total()
    }

    pub fn median(&self) -> Option<f64> {
        self.histogram
            .median_key()
            .map(|bucket| PercentBucket(bucket).value())
    }

    /// Observations at or above `threshold`, compared at bucket resolution.
    pub fn count_at_or_above(&self, threshold: f64) -> u64 {
        let bucket = ((threshold.clamp(0.0, 100.0) * PERCENT_RESOLUTION) + 1e-9).floor() as u16;
        self.histogram.count_at_or_above(bucket)
    }

    pub fn percent_at_or_above(&self, threshold: f64) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        100.0 * self.count_at_or_above(threshold) as f64 / total as f64
    }

    pub fn merge(&mut self, other: &PercentDistribution) {
        self.histogram.merge(&other.histogram);
    }

    pub fn merged(mut self, other: &PercentDistribution) -> Self {
        self.merge(other);
        self
    }
}

/// Tracker for read lengths, keyed by exact length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LengthDistribution {
    histogram: Histogram<u64>,
}

impl LengthDistribution {
    pub fn new() -> Self {
        LengthDistribution::default()
    }

    pub fn update(&mut self, length: i64) -> Result<(), DomainError> {
        let length = u64::try_from(length).map_err(|_| DomainError::NegativeLength(length))?;
        self.add(length);
        Ok(())
    }

    pub fn add(&mut self, length: u64) {
        self.histogram.add(length);
    }

    pub fn total(&self) -> u64 {
        self.histogram.total()
    }

    pub fn total_bases(&self) -> u64 {
        self.histogram
            .iter()
            .fold(0u64, |sum, (length, count)| sum.saturating_add(length.saturating_mul(*count)))
    }

    pub fn median(&self) -> Option<u64> {
        self.histogram.median_key()
    }

    /// Smallest length L such that reads of length >= L hold at least half of all bases.
    pub fn n50(&self) -> Option<u64> {
        if self.histogram.is_empty() {
            return None;
        }
        let total = self.total_bases();
        let mut cumulative = 0u64;
        for (length, count) in self.histogram.iter().rev() {
            cumulative = cumulative.saturating_add(length.saturating_mul(*count));
            if cumulative.saturating_mul(2) >= total {
                return Some(*length);
            }
        }
        None
    }

    pub fn count_at_or_above(&self, length: u64) -> u64 {
        self.histogram.count_at_or_above(length)
    }

    pub fn merge(&mut self, other: &LengthDistribution) {
        self.histogram.merge(&other.histogram);
    }

    pub fn merged(mut self, other: &LengthDistribution) -> Self {
        self.merge(other);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn percent(values: &[f64]) -> PercentDistribution {
        let mut dist = PercentDistribution::new();
        for v in values {
            dist.update("accuracy", *v).unwrap();
        }
        dist
    }

    fn lengths(values: &[i64]) -> LengthDistribution {
        let mut dist = LengthDistribution::new();
        for v in values {
            dist.update(*v).unwrap();
        }
        dist
    }

    #[test]
    fn test_median_single_value() {
        assert_eq!(percent(&[90.0]).median(), Some(90.0));
    }

    #[test]
    fn test_median_takes_lower_middle() {
        assert_eq!(percent(&[80.0, 90.0]).median(), Some(80.0));
        assert_eq!(percent(&[90.0, 80.0, 85.0, 95.0]).median(), Some(85.0));
        assert_eq!(lengths(&[10, 20, 30]).median(), Some(20));
    }

    #[test]
    fn test_median_empty() {
        assert_eq!(PercentDistribution::new().median(), None);
        assert_eq!(LengthDistribution::new().median(), None);
    }

    #[test]
    fn test_percent_bucketing() {
        assert_eq!(PercentBucket::new("q", 80.3).unwrap().value(), 80.3);
        assert_eq!(PercentBucket::new("q", 99.99).unwrap().value(), 99.9);
        assert_eq!(PercentBucket::new("q", 100.0).unwrap().value(), 100.0);
        assert_eq!(PercentBucket::new("q", 0.0).unwrap().value(), 0.0);
    }

    #[test]
    fn test_percent_out_of_domain() {
        let mut dist = PercentDistribution::new();
        assert_eq!(
            dist.update("accuracy", 100.5),
            Err(DomainError::PercentOutOfRange("accuracy", 100.5))
        );
        assert!(dist.update("accuracy", -0.1).is_err());
        assert!(dist.update("accuracy", f64::NAN).is_err());
        assert_eq!(dist.total(), 0);
    }

    #[test]
    fn test_negative_length() {
        let mut dist = LengthDistribution::new();
        assert_eq!(dist.update(-5), Err(DomainError::NegativeLength(-5)));
        assert_eq!(dist.total(), 0);
    }

    #[test]
    fn test_coverage_threshold() {
        let dist = percent(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 79.9, 80.0, 95.0, 100.0]);
        assert_eq!(dist.count_at_or_above(80.0), 3);
        assert_eq!(dist.percent_at_or_above(80.0), 30.0);
        assert_eq!(PercentDistribution::new().percent_at_or_above(80.0), 0.0);
    }

    #[test]
    fn test_n50() {
        assert_eq!(lengths(&[100, 200, 300, 400]).n50(), Some(300));
        assert_eq!(lengths(&[1000]).n50(), Some(1000));
        assert_eq!(lengths(&[10, 10, 10, 1000]).n50(), Some(1000));
        assert_eq!(LengthDistribution::new().n50(), None);
    }

    #[test]
    fn test_merge_is_keywise_sum() {
        let a = lengths(&[100, 200, 200]);
        let b = lengths(&[200, 300]);
        let merged = a.clone().merged(&b);
        assert_eq!(merged.total(), 5);
        assert_eq!(merged.count_at_or_above(200), 4);
        assert_eq!(merged, b.clone().merged(&a));
        assert_eq!(merged, lengths(&[100, 200, 200, 200, 300]));
    }

    #[test]
    fn test_merge_associative() {
        let a = percent(&[10.0, 50.5]);
        let b = percent(&[50.5, 99.0]);
        let c = percent(&[0.0]);
        let left = a.clone().merged(&b).merged(&c);
        let right = a.merged(&b.merged(&c));
        assert_eq!(left, right);
    }

    #[test]
    fn test_serde_keeps_counts() {
        let dist = percent(&[90.0, 90.0, 12.3]);
        let json = serde_json::to_string(&dist).unwrap();
        assert_eq!(json, r#"{"counts":{"123":1,"900":2}}"#);
        let back: PercentDistribution = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dist);
    }

    #[test]
    fn test_serde_rejects_bucket_overflow() {
        let result: Result<PercentDistribution, _> =
            serde_json::from_str(r#"{"counts":{"1001":1}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_serde_rejects_zero_counts() {
        let result: Result<LengthDistribution, _> = serde_json::from_str(r#"{"counts":{"500":0}}"#);
        assert!(result.is_err());
        let result: Result<PercentDistribution, _> =
            serde_json::from_str(r#"{"counts":{"900":0,"910":2}}"#);
        assert!(result.is_err());

        let dist: LengthDistribution = serde_json::from_str(r#"{"counts":{"500":3}}"#).unwrap();
        assert_eq!(dist.total_bases(), 1500);
    }

    #[test]
    fn test_huge_lengths_saturate() {
        let mut dist = LengthDistribution::new();
        dist.add(u64::MAX);
        dist.add(u64::MAX - 1);
        dist.add(10);
        assert_eq!(dist.total_bases(), u64::MAX);
        assert_eq!(dist.n50(), Some(u64::MAX));
        assert_eq!(dist.total(), 3);
    }
}
