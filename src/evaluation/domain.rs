//! Per-family evaluation results and the two-target ranking.

use serde::{Deserialize, Serialize};

use crate::training::domain::{Family, Target};

use super::metrics::BinaryConfusion;

/// Holdout performance of one candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub target: Target,
    pub family: Family,
    pub f1: f64,
    pub precision: f64,
    pub recall: f64,
    /// Holdout rows the candidate was scored on.
    pub support: usize,
    pub confusion: BinaryConfusion,
    /// One-based position in the ranked table.
    pub rank: usize,
}

/// Ranked tables of both targets, best first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub admission: Vec<EvaluationResult>,
    pub scholarship: Vec<EvaluationResult>,
}
