//! Domain types for classifier training.

use std::collections::BTreeMap;
use std::fmt;

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::common::error::AdmitResult;
use crate::common::ids::RunId;

use super::models::{LogisticModel, NaiveBayesModel, TreeModel};

/// Classifier families, in declaration order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    LogisticRegression,
    GaussianNaiveBayes,
    DecisionTree,
}

impl Family {
    pub fn name(&self) -> &'static str {
        match self {
            Family::LogisticRegression => "logistic_regression",
            Family::GaussianNaiveBayes => "gaussian_naive_bayes",
            Family::DecisionTree => "decision_tree",
        }
    }

    /// Position in declaration order, the last ranking tie-break.
    pub fn order(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The two prediction targets.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Admission,
    Scholarship,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Target::Admission => "admission",
            Target::Scholarship => "scholarship",
        })
    }
}

/// One hyper-parameter combination; keys sorted.
pub type Params = BTreeMap<String, f64>;

/// Fitting side of a classifier family.
pub trait Estimator {
    fn family(&self) -> Family;

    fn fit(&self, x: ArrayView2<'_, f64>, y: &[bool]) -> AdmitResult<FittedModel>;
}

/// Serializable fitted classifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum FittedModel {
    LogisticRegression(LogisticModel),
    GaussianNaiveBayes(NaiveBayesModel),
    DecisionTree(TreeModel),
}

impl FittedModel {
    pub fn family(&self) -> Family {
        match self {
            FittedModel::LogisticRegression(_) => Family::LogisticRegression,
            FittedModel::GaussianNaiveBayes(_) => Family::GaussianNaiveBayes,
            FittedModel::DecisionTree(_) => Family::DecisionTree,
        }
    }

    /// Probability of the positive class.
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        match self {
            FittedModel::LogisticRegression(m) => m.predict_proba(row),
            FittedModel::GaussianNaiveBayes(m) => m.predict_proba(row),
            FittedModel::DecisionTree(m) => m.predict_proba(row),
        }
    }

    pub fn predict(&self, row: &[f64]) -> bool {
        self.predict_proba(row) >= 0.5
    }

    pub fn predict_all(&self, x: ArrayView2<'_, f64>) -> Vec<bool> {
        x.rows()
            .into_iter()
            .map(|row| self.predict(&row.to_vec()))
            .collect()
    }
}

/// Best configuration of one family for one target, refit on the full subset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub run_id: RunId,
    pub target: Target,
    pub family: Family,
    pub params: Params,
    /// Mean cross-validated positive-class F1 of `params`.
    pub cv_score: f64,
    pub model: FittedModel,
}

/// Candidates of both targets from one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingOutput {
    pub admission: Vec<TrainedModel>,
    pub scholarship: Vec<TrainedModel>,
}
