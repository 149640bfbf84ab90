//! Classifier families: logistic regression, Gaussian naive Bayes and a CART tree.

use std::f64::consts::PI;

use ndarray::{Array1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::common::error::{AdmitError, AdmitResult};

use super::domain::{Estimator, Family, FittedModel, Params};

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn check_shape(family: Family, x: &ArrayView2<'_, f64>, y: &[bool]) -> AdmitResult<()> {
    if x.nrows() == 0 {
        return Err(AdmitError::training(family, "no training rows"));
    }
    if x.nrows() != y.len() {
        return Err(AdmitError::training(family, "feature and label lengths differ"));
    }
    Ok(())
}

/// Build the estimator of `family` from one grid combination.
pub fn build_estimator(family: Family, params: &Params) -> AdmitResult<Box<dyn Estimator>> {
    let allowed: &[&str] = match family {
        Family::LogisticRegression => &["learning_rate", "l2", "epochs"],
        Family::GaussianNaiveBayes => &["var_smoothing"],
        Family::DecisionTree => &["max_depth", "min_samples_split"],
    };
    if let Some(unknown) = params.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(AdmitError::training(family, format!("unknown parameter '{unknown}'")));
    }
    let get = |key: &str, default: f64| params.get(key).copied().unwrap_or(default);
    let bad = |key: &str| AdmitError::training(family, format!("invalid value for '{key}'"));

    Ok(match family {
        Family::LogisticRegression => {
            let (learning_rate, l2, epochs) = (get("learning_rate", 0.1), get("l2", 0.0), get("epochs", 300.0));
            if !(learning_rate > 0.0) {
                return Err(bad("learning_rate"));
            }
            if !(l2 >= 0.0) {
                return Err(bad("l2"));
            }
            if !(epochs >= 1.0) {
                return Err(bad("epochs"));
            }
            Box::new(LogisticRegression {
                learning_rate,
                l2,
                epochs: epochs as usize,
            })
        }
        Family::GaussianNaiveBayes => {
            let var_smoothing = get("var_smoothing", 1e-9);
            if !(var_smoothing >= 0.0) {
                return Err(bad("var_smoothing"));
            }
            Box::new(GaussianNaiveBayes { var_smoothing })
        }
        Family::DecisionTree => {
            let (max_depth, min_samples_split) = (get("max_depth", 5.0), get("min_samples_split", 2.0));
            if !(max_depth >= 1.0) {
                return Err(bad("max_depth"));
            }
            if !(min_samples_split >= 2.0) {
                return Err(bad("min_samples_split"));
            }
            Box::new(DecisionTree {
                max_depth: max_depth as usize,
                min_samples_split: min_samples_split as usize,
            })
        }
    })
}

// ---------------------------------------------------------------------------
// Logistic regression

/// Full-batch gradient descent on the L2-regularised log loss.
pub struct LogisticRegression {
    pub learning_rate: f64,
    pub l2: f64,
    pub epochs: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub weights: Array1<f64>,
    pub bias: f64,
}

impl LogisticModel {
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let z: f64 = row.iter().zip(self.weights.iter()).map(|(a, w)| a * w).sum();
        sigmoid(z + self.bias)
    }
}

impl Estimator for LogisticRegression {
    fn family(&self) -> Family {
        Family::LogisticRegression
    }

    fn fit(&self, x: ArrayView2<'_, f64>, y: &[bool]) -> AdmitResult<FittedModel> {
        check_shape(self.family(), &x, y)?;
        let n = x.nrows() as f64;
        let target: Array1<f64> = y.iter().map(|&v| if v { 1.0 } else { 0.0 }).collect();
        let mut weights = Array1::<f64>::zeros(x.ncols());
        let mut bias = 0.0;
        for _ in 0..self.epochs {
            let p = (x.dot(&weights) + bias).mapv(sigmoid);
            let err = &p - &target;
            let grad = x.t().dot(&err) / n + &weights * self.l2;
            weights = weights - grad * self.learning_rate;
            bias -= self.learning_rate * err.sum() / n;
        }
        if weights.iter().any(|w| !w.is_finite()) || !bias.is_finite() {
            return Err(AdmitError::training(self.family(), "gradient descent diverged"));
        }
        Ok(FittedModel::LogisticRegression(LogisticModel { weights, bias }))
    }
}

// ---------------------------------------------------------------------------
// Gaussian naive Bayes

pub struct GaussianNaiveBayes {
    pub var_smoothing: f64,
}

/// Per-class priors, means and variances; index 0 is the negative class.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NaiveBayesModel {
    pub priors: [f64; 2],
    pub means: [Vec<f64>; 2],
    pub variances: [Vec<f64>; 2],
}

impl NaiveBayesModel {
    fn joint_log_likelihood(&self, class: usize, row: &[f64]) -> f64 {
        let mut jll = self.priors[class].ln();
        for ((x, m), v) in row.iter().zip(&self.means[class]).zip(&self.variances[class]) {
            jll -= 0.5 * ((2.0 * PI * v).ln() + (x - m).powi(2) / v);
        }
        jll
    }

    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        sigmoid(self.joint_log_likelihood(1, row) - self.joint_log_likelihood(0, row))
    }
}

impl Estimator for GaussianNaiveBayes {
    fn family(&self) -> Family {
        Family::GaussianNaiveBayes
    }

    fn fit(&self, x: ArrayView2<'_, f64>, y: &[bool]) -> AdmitResult<FittedModel> {
        check_shape(self.family(), &x, y)?;
        let max_var = x
            .var_axis(Axis(0), 0.0)
            .iter()
            .copied()
            .fold(0.0_f64, f64::max);
        let epsilon = self.var_smoothing * max_var;

        let mut priors = [0.0; 2];
        let mut means: [Vec<f64>; 2] = Default::default();
        let mut variances: [Vec<f64>; 2] = Default::default();
        for (class, label) in [(0usize, false), (1usize, true)] {
            let rows: Vec<usize> = (0..y.len()).filter(|&i| y[i] == label).collect();
            if rows.is_empty() {
                return Err(AdmitError::training(self.family(), "both classes are required"));
            }
            let subset = x.select(Axis(0), &rows);
            priors[class] = rows.len() as f64 / y.len() as f64;
            means[class] = subset.mean_axis(Axis(0)).map(|m| m.to_vec()).unwrap_or_default();
            variances[class] = subset
                .var_axis(Axis(0), 0.0)
                .iter()
                .map(|v| (v + epsilon).max(1e-12))
                .collect();
        }
        Ok(FittedModel::GaussianNaiveBayes(NaiveBayesModel {
            priors,
            means,
            variances,
        }))
    }
}

// ---------------------------------------------------------------------------
// Decision tree

/// CART with Gini impurity; ties keep the first feature and threshold.
pub struct DecisionTree {
    pub max_depth: usize,
    pub min_samples_split: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum TreeNode {
    Leaf {
        proba: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Flattened tree; node 0 is the root.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeModel {
    pub nodes: Vec<TreeNode>,
}

impl TreeModel {
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let mut at = 0;
        loop {
            match self.nodes.get(at) {
                Some(TreeNode::Leaf { proba }) => return *proba,
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = row.get(*feature).copied().unwrap_or(0.0);
                    at = if value <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], at: usize) -> usize {
            match nodes.get(at) {
                Some(TreeNode::Split { left, right, .. }) => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }
}

fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    2.0 * p * (1.0 - p)
}

/// Threshold strictly separating `here < next`; adjacent floats have no
/// representable midpoint, so `here` itself is used.
fn midpoint(here: f64, next: f64) -> f64 {
    let mid = here + (next - here) / 2.0;
    if mid >= here && mid < next {
        mid
    } else {
        here
    }
}

fn leaf_proba(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    positives as f64 / total as f64
}

struct SplitChoice {
    feature: usize,
    threshold: f64,
}

fn best_split(x: &ArrayView2<'_, f64>, y: &[bool], idx: &[usize]) -> Option<SplitChoice> {
    let n = idx.len();
    let total_pos = idx.iter().filter(|&&i| y[i]).count();
    let mut best_impurity = gini(total_pos, n) - 1e-12;
    let mut best = None;
    for feature in 0..x.ncols() {
        let mut order = idx.to_vec();
        order.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]).then(a.cmp(&b)));
        let mut left_pos = 0;
        for k in 0..n - 1 {
            if y[order[k]] {
                left_pos += 1;
            }
            let (here, next) = (x[[order[k], feature]], x[[order[k + 1], feature]]);
            if here == next {
                continue;
            }
            let left_n = k + 1;
            let right_n = n - left_n;
            let impurity = (left_n as f64 * gini(left_pos, left_n)
                + right_n as f64 * gini(total_pos - left_pos, right_n))
                / n as f64;
            if impurity < best_impurity {
                best_impurity = impurity;
                best = Some(SplitChoice {
                    feature,
                    threshold: midpoint(here, next),
                });
            }
        }
    }
    best
}

impl DecisionTree {
    fn grow(
        &self,
        x: &ArrayView2<'_, f64>,
        y: &[bool],
        idx: &[usize],
        depth: usize,
        nodes: &mut Vec<TreeNode>,
    ) -> usize {
        let positives = idx.iter().filter(|&&i| y[i]).count();
        let id = nodes.len();
        nodes.push(TreeNode::Leaf {
            proba: leaf_proba(positives, idx.len()),
        });
        let pure = positives == 0 || positives == idx.len();
        if pure || depth >= self.max_depth || idx.len() < self.min_samples_split {
            return id;
        }
        let Some(choice) = best_split(x, y, idx) else {
            return id;
        };
        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = idx
            .iter()
            .copied()
            .partition(|&i| x[[i, choice.feature]] <= choice.threshold);
        if left_idx.is_empty() || right_idx.is_empty() {
            return id;
        }
        let left = self.grow(x, y, &left_idx, depth + 1, nodes);
        let right = self.grow(x, y, &right_idx, depth + 1, nodes);
        nodes[id] = TreeNode::Split {
            feature: choice.feature,
            threshold: choice.threshold,
            left,
            right,
        };
        id
    }
}

impl Estimator for DecisionTree {
    fn family(&self) -> Family {
        Family::DecisionTree
    }

    fn fit(&self, x: ArrayView2<'_, f64>, y: &[bool]) -> AdmitResult<FittedModel> {
        check_shape(self.family(), &x, y)?;
        let idx: Vec<usize> = (0..y.len()).collect();
        let mut nodes = Vec::new();
        self.grow(&x, y, &idx, 0, &mut nodes);
        Ok(FittedModel::DecisionTree(TreeModel { nodes }))
    }
}
