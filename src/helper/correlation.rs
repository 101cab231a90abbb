use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Result of comparing observed against expected per-reference counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Correlation {
    /// Fewer than two references to compare, no expected counts, or no variance on one side.
    Undefined,
    Defined { rho: f64, p_value: f64 },
}

impl Correlation {
    pub fn rho(&self) -> f64 {
        match self {
            Correlation::Undefined => 0.0,
            Correlation::Defined { rho, .. } => *rho,
        }
    }

    pub fn p_value(&self) -> Option<f64> {
        match self {
            Correlation::Undefined => None,
            Correlation::Defined { p_value, .. } => Some(*p_value),
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Correlation::Defined { .. })
    }
}

/// Spearman's rho between observed and expected counts.
///
/// Pairs are built over the union of both tables' reference names; a reference
/// missing from one side counts as zero on that side. An empty expected table
/// leaves the correlation undefined.
pub fn spearman(observed: &BTreeMap<String, u64>, expected: &BTreeMap<String, f64>) -> Correlation {
    if expected.is_empty() {
        return Correlation::Undefined;
    }

    let names: BTreeSet<&String> = observed.keys().chain(expected.keys()).collect();
    if names.len() < 2 {
        return Correlation::Undefined;
    }

    let (xs, ys): (Vec<f64>, Vec<f64>) = names
        .iter()
        .map(|name| {
            (
                observed.get(*name).copied().unwrap_or(0) as f64,
                expected.get(*name).copied().unwrap_or(0.0),
            )
        })
        .unzip();

    match pearson(&rank(&xs), &rank(&ys)) {
        Some(rho) => Correlation::Defined {
            rho,
            p_value: p_value(rho, names.len()),
        },
        None => Correlation::Undefined,
    }
}

/// Average (fractional) ranks, starting at 1; ties share the mean of their positions.
pub fn rank(values: &[f64]) -> Vec<f64> {
    let order: Vec<usize> = (0..values.len())
        .sorted_by(|a, b| values[*a].total_cmp(&values[*b]))
        .collect();

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end (0-based) hold ranks start+1..=end
        let shared = (start + 1 + end) as f64 / 2.0;
        for idx in &order[start..end] {
            ranks[*idx] = shared;
        }
        start = end;
    }
    ranks
}

fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut num = 0.0;
    let mut denom_x = 0.0;
    let mut denom_y = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        num += dx * dy;
        denom_x += dx * dx;
        denom_y += dy * dy;
    }
    if denom_x == 0.0 || denom_y == 0.0 {
        return None;
    }
    Some((num / (denom_x * denom_y).sqrt()).clamp(-1.0, 1.0))
}

/// Two-sided p-value of the t statistic with n - 2 degrees of freedom.
fn p_value(rho: f64, n: usize) -> f64 {
    if n <= 2 {
        return 1.0;
    }
    if rho.abs() >= 1.0 {
        return 0.0;
    }
    let df = (n - 2) as f64;
    let t = rho * (df / (1.0 - rho * rho)).sqrt();
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * dist.sf(t.abs())).min(1.0),
        Err(_) => 1.0,
    }
}
