//! Prediction payload and the immutable production snapshot.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::common::time;
use crate::data::ApplicantRecord;
use crate::registry::ProductionBundle;
use crate::transform;
use crate::transform::features;

/// Decision threshold on the positive-class probability.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Four-field answer of one inference call.
///
/// The scholarship pair is `None` unless the applicant is admitted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub admission_decision: String,
    pub admission_probability: f64,
    pub scholarship_decision: Option<String>,
    pub scholarship_probability: Option<f64>,
}

/// Body of `POST /predict-json`: the prediction plus the applicant profile
/// chart values and the moment it was served.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    pub predictions: Prediction,
    pub radar_data: Vec<f64>,
    /// RFC 3339, UTC.
    pub timestamp: String,
}

impl PredictionReport {
    pub fn new(predictions: Prediction, record: &ApplicantRecord) -> Self {
        Self {
            predictions,
            radar_data: features::radar_profile(record).to_vec(),
            timestamp: time::now_rfc3339(),
        }
    }
}

/// A loaded production bundle; every request uses exactly one.
#[derive(Debug)]
pub struct ProductionSnapshot {
    pub bundle: ProductionBundle,
    /// Modification time of the bundle file this snapshot was read from.
    pub modified: SystemTime,
}

impl ProductionSnapshot {
    pub fn predict(&self, record: &ApplicantRecord) -> Prediction {
        let row = transform::apply(&self.bundle.transformer, record);
        let admission_probability = self.bundle.admission.model.predict_proba(&row);
        let admitted = admission_probability >= DECISION_THRESHOLD;
        let scholarship_probability =
            admitted.then(|| self.bundle.scholarship.model.predict_proba(&row));
        Prediction {
            admission_decision: if admitted { "admitted" } else { "rejected" }.to_string(),
            admission_probability,
            scholarship_decision: scholarship_probability.map(|p| {
                if p >= DECISION_THRESHOLD {
                    "scholarship"
                } else {
                    "no_scholarship"
                }
                .to_string()
            }),
            scholarship_probability,
        }
    }
}
