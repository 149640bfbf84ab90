//! `best_model/` directory holding the production bundle.
//!
//! `model.json` is the single pointer readers look at and the authoritative
//! copy of the metrics; it is only ever replaced by rename, after the
//! `metrics.yaml` card and `reference.csv` sidecars are in place. Superseded
//! bundles move to `history/<run>.json`. Promotions serialize on an advisory
//! lock over `promotion.lock`.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use fd_lock::RwLock;

use crate::artifact::repo_fs::{read_json, write_atomic};
use crate::common::error::{AdmitError, AdmitResult};
use crate::data::repo_fs::read_csv;
use crate::data::Frame;

use super::domain::{MetricsCard, ProductionBundle, PromotionRepo};

pub const MODEL_FILE: &str = "model.json";
pub const METRICS_FILE: &str = "metrics.yaml";
pub const REFERENCE_FILE: &str = "reference.csv";
pub const HISTORY_DIR: &str = "history";
pub const LOCK_FILE: &str = "promotion.lock";

pub struct FsPromotionRepo {
    dir: PathBuf,
}

impl FsPromotionRepo {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    /// Modification time of the bundle file, `None` before the first promotion.
    pub fn modified(&self) -> Option<SystemTime> {
        fs::metadata(self.model_path()).and_then(|m| m.modified()).ok()
    }

    fn archive_current(&self) -> AdmitResult<()> {
        let Some(current) = self.current()? else {
            return Ok(());
        };
        let bytes = fs::read(self.model_path())?;
        let target = self
            .dir
            .join(HISTORY_DIR)
            .join(format!("{}.json", current.run_id));
        write_atomic(&target, &bytes)?;
        tracing::debug!(run = %current.run_id, "previous bundle archived");
        Ok(())
    }
}

fn frame_to_csv(frame: &Frame) -> AdmitResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&frame.columns)?;
    for row in &frame.rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| AdmitError::serialization(e.error()))
}

impl PromotionRepo for FsPromotionRepo {
    fn current(&self) -> AdmitResult<Option<ProductionBundle>> {
        let path = self.model_path();
        if !path.is_file() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    fn install(&self, bundle: &ProductionBundle, reference: &Frame) -> AdmitResult<()> {
        self.archive_current()?;
        let card = MetricsCard {
            run_id: bundle.run_id.clone(),
            promoted_at: bundle.promoted_at.clone(),
            metrics: bundle.metrics.clone(),
        };
        write_atomic(&self.dir.join(METRICS_FILE), serde_yaml::to_string(&card)?.as_bytes())?;
        write_atomic(&self.dir.join(REFERENCE_FILE), &frame_to_csv(reference)?)?;
        write_atomic(&self.model_path(), &serde_json::to_vec_pretty(bundle)?)?;
        Ok(())
    }

    fn reference(&self) -> AdmitResult<Option<Frame>> {
        let path = self.dir.join(REFERENCE_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        read_csv(&path).map(Some)
    }

    fn exclusive(&self, f: &mut dyn FnMut() -> AdmitResult<()>) -> AdmitResult<()> {
        fs::create_dir_all(&self.dir)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(LOCK_FILE))?;
        let mut lock = RwLock::new(file);
        let _guard = lock.write()?;
        f()
    }
}
