//! Holdout scoring and candidate ranking.

use std::cmp::Ordering;

use ndarray::Array2;

use crate::artifact::repo_fs::write_json;
use crate::artifact::{RunNamespace, Stage};
use crate::common::error::AdmitResult;
use crate::training::domain::TrainedModel;

use super::domain::{EvaluationResult, Ranking};
use super::metrics::BinaryConfusion;

pub const RANKING_FILE: &str = "ranking.json";

/// F1 desc, then precision desc, then family declaration order.
pub fn compare(a: &EvaluationResult, b: &EvaluationResult) -> Ordering {
    b.f1.total_cmp(&a.f1)
        .then_with(|| b.precision.total_cmp(&a.precision))
        .then_with(|| a.family.order().cmp(&b.family.order()))
}

/// Sort results best first.
pub fn rank(results: &mut [EvaluationResult]) {
    results.sort_by(compare);
    for (i, r) in results.iter_mut().enumerate() {
        r.rank = i + 1;
    }
}

/// Score every candidate on the holdout and return them ranked.
pub fn evaluate(candidates: &[TrainedModel], x: &Array2<f64>, y: &[bool]) -> Vec<EvaluationResult> {
    let mut results: Vec<EvaluationResult> = candidates
        .iter()
        .map(|candidate| {
            let predicted = candidate.model.predict_all(x.view());
            let confusion = BinaryConfusion::from_predictions(&predicted, y);
            EvaluationResult {
                target: candidate.target,
                family: candidate.family,
                f1: confusion.f1(),
                precision: confusion.precision(),
                recall: confusion.recall(),
                support: y.len(),
                confusion,
                rank: 0,
            }
        })
        .collect();
    rank(&mut results);
    results
}

/// Candidate at the top of `ranking`.
pub fn select_best<'a>(
    candidates: &'a [TrainedModel],
    ranking: &[EvaluationResult],
) -> Option<&'a TrainedModel> {
    let top = ranking.first()?;
    candidates
        .iter()
        .find(|c| c.family == top.family && c.target == top.target)
}

pub fn persist_ranking(ns: &RunNamespace, ranking: &Ranking) -> AdmitResult<()> {
    write_json(&ns.path(Stage::ModelEvaluation, RANKING_FILE), ranking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::domain::{Family, Target};

    fn result(family: Family, f1: f64, precision: f64) -> EvaluationResult {
        EvaluationResult {
            target: Target::Admission,
            family,
            f1,
            precision,
            recall: 0.5,
            support: 10,
            confusion: BinaryConfusion::default(),
            rank: 0,
        }
    }

    #[test]
    fn ranking_breaks_ties_by_precision_then_family() {
        let mut results = vec![
            result(Family::DecisionTree, 0.8, 0.9),
            result(Family::GaussianNaiveBayes, 0.8, 0.7),
            result(Family::LogisticRegression, 0.8, 0.7),
            result(Family::DecisionTree, 0.6, 1.0),
        ];
        rank(&mut results);
        let order: Vec<Family> = results.iter().map(|r| r.family).collect();
        assert_eq!(
            order,
            vec![
                Family::DecisionTree,
                Family::LogisticRegression,
                Family::GaussianNaiveBayes,
                Family::DecisionTree,
            ]
        );
        assert_eq!(results[3].f1, 0.6);
        let ranks: Vec<usize> = results.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }
}
