//! Production bundle and promotion decision types.

use serde::{Deserialize, Serialize};

use crate::common::error::AdmitResult;
use crate::common::ids::RunId;
use crate::data::Frame;
use crate::evaluation::EvaluationResult;
use crate::training::domain::{Family, Params, TrainedModel};
use crate::transform::TransformerState;

/// Holdout metrics carried with a bundle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetMetrics {
    pub family: Family,
    pub params: Params,
    pub f1: f64,
    pub precision: f64,
    pub recall: f64,
}

impl TargetMetrics {
    pub fn new(model: &TrainedModel, result: &EvaluationResult) -> Self {
        Self {
            family: model.family,
            params: model.params.clone(),
            f1: result.f1,
            precision: result.precision,
            recall: result.recall,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BundleMetrics {
    pub admission: TargetMetrics,
    pub scholarship: TargetMetrics,
    /// Mean of both F1 scores; the promotion metric.
    pub combined: f64,
}

impl BundleMetrics {
    pub fn new(admission: TargetMetrics, scholarship: TargetMetrics) -> Self {
        let combined = combined_metric(admission.f1, scholarship.f1);
        Self {
            admission,
            scholarship,
            combined,
        }
    }
}

pub fn combined_metric(admission_f1: f64, scholarship_f1: f64) -> f64 {
    (admission_f1 + scholarship_f1) / 2.0
}

/// Everything inference needs, swapped as one unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductionBundle {
    pub run_id: RunId,
    pub promoted_at: String,
    pub transformer: TransformerState,
    pub admission: TrainedModel,
    pub scholarship: TrainedModel,
    pub metrics: BundleMetrics,
}

/// Human readable summary written next to the bundle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsCard {
    pub run_id: RunId,
    pub promoted_at: String,
    pub metrics: BundleMetrics,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionOutcome {
    Promoted,
    Retained,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PromotionDecision {
    pub run_id: RunId,
    pub outcome: PromotionOutcome,
    pub previous_run: Option<RunId>,
    pub previous: Option<f64>,
    pub new: f64,
    pub delta: Option<f64>,
    pub min_delta: f64,
}

/// Storage of the production pointer.
pub trait PromotionRepo {
    fn current(&self) -> AdmitResult<Option<ProductionBundle>>;

    /// Archive the current bundle, then atomically replace it.
    fn install(&self, bundle: &ProductionBundle, reference: &Frame) -> AdmitResult<()>;

    /// Reference data stored with the current bundle.
    fn reference(&self) -> AdmitResult<Option<Frame>>;

    /// Run `f` while holding the exclusive promotion lock. Reads of
    /// [`Self::current`] inside `f` see every earlier promotion.
    fn exclusive(&self, f: &mut dyn FnMut() -> AdmitResult<()>) -> AdmitResult<()>;
}
