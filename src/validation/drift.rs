//! Per-column distribution distances.

use std::collections::BTreeSet;

/// Distance between a reference and a current sample of one column.
pub trait ColumnDistance {
    fn name(&self) -> &'static str;

    fn numeric(&self, reference: &[f64], current: &[f64]) -> f64;

    fn categorical(&self, reference: &[&str], current: &[&str]) -> f64;
}

const SMOOTHING: f64 = 0.0001;

/// Population Stability Index over reference quantile bins.
#[derive(Copy, Clone, Debug)]
pub struct Psi {
    pub bins: usize,
}

impl Default for Psi {
    fn default() -> Self {
        Self { bins: 10 }
    }
}

fn psi_from_counts(reference: &[usize], current: &[usize]) -> f64 {
    let total_ref: usize = reference.iter().sum();
    let total_cur: usize = current.iter().sum();
    let mut psi = 0.0;
    for (r, c) in reference.iter().zip(current) {
        let r_pct = (*r as f64 + SMOOTHING) / (total_ref as f64 + SMOOTHING * reference.len() as f64);
        let c_pct = (*c as f64 + SMOOTHING) / (total_cur as f64 + SMOOTHING * current.len() as f64);
        psi += (c_pct - r_pct) * (c_pct / r_pct).ln();
    }
    psi
}

/// Interior bin edges at the reference quantiles, duplicates removed.
fn quantile_edges(reference: &[f64], bins: usize) -> Vec<f64> {
    let mut sorted = reference.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mut edges: Vec<f64> = (1..bins)
        .map(|i| sorted[(sorted.len() * i / bins).min(sorted.len() - 1)])
        .collect();
    edges.dedup();
    edges
}

fn bin_counts(values: &[f64], edges: &[f64]) -> Vec<usize> {
    let mut counts = vec![0usize; edges.len() + 1];
    for v in values {
        counts[edges.partition_point(|e| e < v)] += 1;
    }
    counts
}

impl ColumnDistance for Psi {
    fn name(&self) -> &'static str {
        "psi"
    }

    fn numeric(&self, reference: &[f64], current: &[f64]) -> f64 {
        if reference.is_empty() || current.is_empty() {
            return 0.0;
        }
        let edges = quantile_edges(reference, self.bins.max(2));
        psi_from_counts(&bin_counts(reference, &edges), &bin_counts(current, &edges))
    }

    fn categorical(&self, reference: &[&str], current: &[&str]) -> f64 {
        if reference.is_empty() || current.is_empty() {
            return 0.0;
        }
        let categories: BTreeSet<&str> = reference.iter().chain(current).copied().collect();
        let count = |sample: &[&str]| -> Vec<usize> {
            categories
                .iter()
                .map(|c| sample.iter().filter(|v| *v == c).count())
                .collect()
        };
        psi_from_counts(&count(reference), &count(current))
    }
}
