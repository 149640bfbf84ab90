//! Grid search per family and target.

use ndarray::{Array2, Axis};

use crate::common::config::{FamilyGrid, PipelineCfg};
use crate::common::error::{AdmitCode, AdmitError, AdmitResult};
use crate::common::ids::RunId;

use super::domain::{FittedModel, Params, Target, TrainedModel, TrainingOutput};
use super::models::build_estimator;
use super::search::{cross_validate, expand_grid, stratified_folds};

/// Runs the configured grids for both targets.
pub struct Trainer {
    families: Vec<FamilyGrid>,
    cv_folds: usize,
    seed: u64,
}

impl Trainer {
    pub fn new(cfg: &PipelineCfg) -> Self {
        Self {
            families: cfg.families.clone(),
            cv_folds: cfg.cv_folds,
            seed: cfg.seed,
        }
    }

    /// Admission candidates use every row, scholarship candidates only the
    /// admitted ones.
    pub fn train(
        &self,
        run_id: &RunId,
        x: &Array2<f64>,
        admission: &[bool],
        scholarship: &[bool],
    ) -> AdmitResult<TrainingOutput> {
        if x.nrows() != admission.len() || x.nrows() != scholarship.len() {
            return Err(AdmitError::training("input", "feature and label lengths differ"));
        }
        let admitted: Vec<usize> = (0..admission.len()).filter(|&i| admission[i]).collect();
        let x_admitted = x.select(Axis(0), &admitted);
        let y_scholarship: Vec<bool> = admitted.iter().map(|&i| scholarship[i]).collect();

        Ok(TrainingOutput {
            admission: self.train_target(run_id, Target::Admission, x, admission)?,
            scholarship: self.train_target(run_id, Target::Scholarship, &x_admitted, &y_scholarship)?,
        })
    }

    /// One candidate per family that could be fitted.
    pub fn train_target(
        &self,
        run_id: &RunId,
        target: Target,
        x: &Array2<f64>,
        y: &[bool],
    ) -> AdmitResult<Vec<TrainedModel>> {
        let folds = stratified_folds(y, self.cv_folds, self.seed);
        let mut candidates = Vec::new();
        for entry in &self.families {
            match self.search_family(entry, x, y, &folds) {
                Ok((params, cv_score, model)) => {
                    tracing::info!(%target, family = %entry.family, cv_score, ?params, "family fitted");
                    candidates.push(TrainedModel {
                        run_id: run_id.clone(),
                        target,
                        family: entry.family,
                        params,
                        cv_score,
                        model,
                    });
                }
                Err(err) => tracing::warn!(
                    %target,
                    family = %entry.family,
                    code = AdmitCode::TrainingFailure.as_u32(),
                    error = %err,
                    "family excluded"
                ),
            }
        }
        if candidates.is_empty() {
            return Err(AdmitError::training(target, "every classifier family failed"));
        }
        Ok(candidates)
    }

    fn search_family(
        &self,
        entry: &FamilyGrid,
        x: &Array2<f64>,
        y: &[bool],
        folds: &[Vec<usize>],
    ) -> AdmitResult<(Params, f64, FittedModel)> {
        let combos = expand_grid(&entry.grid);
        if combos.is_empty() {
            return Err(AdmitError::training(entry.family, "empty parameter grid"));
        }
        let mut best: Option<(Params, f64)> = None;
        let mut last_err = None;
        for params in combos {
            let estimator = build_estimator(entry.family, &params)?;
            match cross_validate(estimator.as_ref(), x, y, folds) {
                Ok(score) => {
                    if best.as_ref().map_or(true, |(_, s)| score > *s) {
                        best = Some((params, score));
                    }
                }
                Err(err) => {
                    tracing::debug!(family = %entry.family, ?params, error = %err, "combination failed");
                    last_err = Some(err);
                }
            }
        }
        let Some((params, score)) = best else {
            return Err(last_err
                .unwrap_or_else(|| AdmitError::training(entry.family, "no combination could be scored")));
        };
        let model = build_estimator(entry.family, &params)?.fit(x.view(), y)?;
        Ok((params, score, model))
    }
}
