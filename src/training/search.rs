//! Grid expansion and stratified k-fold cross-validation.

use std::collections::BTreeMap;

use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::common::error::AdmitResult;
use crate::evaluation::metrics::BinaryConfusion;

use super::domain::{Estimator, Params};

/// Cartesian product of the grid, keys in sorted order, last key varying fastest.
pub fn expand_grid(grid: &BTreeMap<String, Vec<f64>>) -> Vec<Params> {
    let mut combos = vec![Params::new()];
    for (key, values) in grid {
        combos = combos
            .into_iter()
            .flat_map(|base| {
                values.iter().map(move |v| {
                    let mut next = base.clone();
                    next.insert(key.clone(), *v);
                    next
                })
            })
            .collect();
    }
    combos
}

/// Held-out row indices of each fold; every class is dealt round-robin after
/// a seeded shuffle.
pub fn stratified_folds(y: &[bool], k: usize, seed: u64) -> Vec<Vec<usize>> {
    let k = k.max(1);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut folds = vec![Vec::new(); k];
    let mut next = 0;
    for label in [false, true] {
        let mut members: Vec<usize> = (0..y.len()).filter(|&i| y[i] == label).collect();
        members.shuffle(&mut rng);
        for i in members {
            folds[next % k].push(i);
            next += 1;
        }
    }
    for fold in &mut folds {
        fold.sort_unstable();
    }
    folds
}

/// Mean positive-class F1 of `estimator` over `folds`.
pub fn cross_validate(
    estimator: &dyn Estimator,
    x: &Array2<f64>,
    y: &[bool],
    folds: &[Vec<usize>],
) -> AdmitResult<f64> {
    let mut scores = Vec::with_capacity(folds.len());
    for held_out in folds.iter().filter(|f| !f.is_empty()) {
        let train: Vec<usize> = (0..y.len()).filter(|i| held_out.binary_search(i).is_err()).collect();
        let train_y: Vec<bool> = train.iter().map(|&i| y[i]).collect();
        let model = estimator.fit(x.select(Axis(0), &train).view(), &train_y)?;
        let predicted = model.predict_all(x.select(Axis(0), held_out).view());
        let actual: Vec<bool> = held_out.iter().map(|&i| y[i]).collect();
        scores.push(BinaryConfusion::from_predictions(&predicted, &actual).f1());
    }
    if scores.is_empty() {
        return Ok(0.0);
    }
    Ok(scores.iter().sum::<f64>() / scores.len() as f64)
}
