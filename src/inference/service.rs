//! Synchronous single-record prediction against the production bundle.
//!
//! The bundle is held as `Arc<ProductionSnapshot>` and reloaded when the
//! bundle file's modification time changes. A failed reload keeps the old
//! snapshot in service.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::common::error::{AdmitError, AdmitResult};
use crate::common::time;
use crate::data::domain::json_cell;
use crate::data::{ApplicantRecord, Cells, ParseMode, SchemaSpec};
use crate::registry::{FsPromotionRepo, PromotionRepo};

use super::domain::{Prediction, PredictionReport, ProductionSnapshot};

pub struct InferenceService {
    repo: FsPromotionRepo,
    schema: SchemaSpec,
    current: RwLock<Option<Arc<ProductionSnapshot>>>,
}

impl InferenceService {
    pub fn new(best_model_dir: impl Into<PathBuf>, schema: SchemaSpec) -> Self {
        Self {
            repo: FsPromotionRepo::new(best_model_dir),
            schema,
            current: RwLock::new(None),
        }
    }

    fn loaded(&self) -> Option<Arc<ProductionSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Snapshot to serve the next request with, reloading if the bundle changed.
    pub fn snapshot(&self) -> AdmitResult<Arc<ProductionSnapshot>> {
        let loaded = self.loaded();
        let Some(modified) = self.repo.modified() else {
            return loaded.ok_or(AdmitError::ModelNotLoaded);
        };
        if let Some(snapshot) = loaded.as_ref().filter(|s| s.modified == modified) {
            return Ok(Arc::clone(snapshot));
        }
        match self.repo.current() {
            Ok(Some(bundle)) => {
                let snapshot = Arc::new(ProductionSnapshot { bundle, modified });
                *self
                    .current
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Arc::clone(&snapshot));
                tracing::info!(run = %snapshot.bundle.run_id, "production bundle loaded");
                Ok(snapshot)
            }
            Ok(None) => loaded.ok_or(AdmitError::ModelNotLoaded),
            Err(err) => match loaded {
                Some(old) => {
                    tracing::warn!(error = %err, run = %old.bundle.run_id, "reload failed, keeping loaded bundle");
                    Ok(old)
                }
                None => Err(err),
            },
        }
    }

    pub fn predict(&self, record: &ApplicantRecord) -> AdmitResult<Prediction> {
        let start = time::now_ms();
        let snapshot = self.snapshot()?;
        let prediction = snapshot.predict(record);
        tracing::debug!(
            run = %snapshot.bundle.run_id,
            admission = prediction.admission_probability,
            dur_ms = time::now_ms().saturating_sub(start) as u64,
            "prediction served"
        );
        Ok(prediction)
    }

    /// Presence and type checks only, then [`Self::predict`].
    pub fn predict_cells(&self, cells: &dyn Cells) -> AdmitResult<Prediction> {
        let record = self.schema.parse_record(cells, None, ParseMode::Inference)?;
        self.predict(&record)
    }

    /// JSON object payload with scalar fields.
    pub fn predict_json(&self, payload: &serde_json::Value) -> AdmitResult<Prediction> {
        let record = self.parse_json(payload)?;
        self.predict(&record)
    }

    /// [`Self::predict_json`] with the profile chart values and a timestamp.
    pub fn report_json(&self, payload: &serde_json::Value) -> AdmitResult<PredictionReport> {
        let record = self.parse_json(payload)?;
        let prediction = self.predict(&record)?;
        Ok(PredictionReport::new(prediction, &record))
    }

    fn parse_json(&self, payload: &serde_json::Value) -> AdmitResult<ApplicantRecord> {
        let object = payload
            .as_object()
            .ok_or_else(|| AdmitError::schema("body", None, "expected a JSON object"))?;
        let cells: BTreeMap<String, String> = object
            .iter()
            .map(|(k, v)| (k.clone(), json_cell(v)))
            .collect();
        self.schema.parse_record(&cells, None, ParseMode::Inference)
    }
}
