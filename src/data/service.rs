//! Ingestion: remote fetch with local fallback, feature store export and the
//! stratified train/holdout split.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::artifact::repo_fs::{write_csv, write_json};
use crate::artifact::{RunNamespace, Stage};
use crate::common::config::AppCfg;
use crate::common::error::{AdmitError, AdmitResult};
use crate::common::ids::SimpleHash;
use crate::common::time;

use super::domain::{Dataset, Frame};
use super::remote::{HttpDocumentSource, RemoteSource};
use super::repo_fs::SnapshotStore;
use super::schema::SchemaSpec;

pub const FEATURE_STORE_FILE: &str = "feature_store/admission_data.csv";
pub const MANIFEST_FILE: &str = "feature_store/manifest.json";
pub const TRAIN_FILE: &str = "ingested/train.csv";
pub const TEST_FILE: &str = "ingested/test.csv";

/// Provenance of an ingested frame.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IngestManifest {
    pub source: String,
    pub rows: usize,
    pub columns: usize,
    pub fingerprint: String,
    pub fetched_at: String,
}

/// Remote store first, latest local snapshot second.
pub struct DataSourceAdapter {
    remote: Option<Box<dyn RemoteSource>>,
    snapshots: SnapshotStore,
    required: Vec<String>,
}

impl DataSourceAdapter {
    pub fn new(
        remote: Option<Box<dyn RemoteSource>>,
        snapshots: SnapshotStore,
        schema: &SchemaSpec,
    ) -> Self {
        Self {
            remote,
            snapshots,
            required: schema.required_columns().into_iter().map(String::from).collect(),
        }
    }

    pub fn from_cfg(cfg: &AppCfg, schema: &SchemaSpec) -> AdmitResult<Self> {
        let remote: Option<Box<dyn RemoteSource>> = match &cfg.remote {
            Some(remote) => Some(Box::new(HttpDocumentSource::new(
                remote.clone(),
                cfg.pipeline.connect_timeout(),
            )?)),
            None => None,
        };
        Ok(Self::new(remote, SnapshotStore::new(&cfg.snapshot_dir), schema))
    }

    fn from_remote(&self) -> Option<(String, Frame)> {
        let remote = self.remote.as_ref()?;
        match remote.find_all() {
            Ok(docs) if !docs.is_empty() => Some((remote.describe(), Frame::from_documents(&docs))),
            Ok(_) => {
                tracing::warn!(source = %remote.describe(), "remote store returned no documents");
                None
            }
            Err(err) => {
                tracing::warn!(source = %remote.describe(), error = %err, "remote fetch failed, using local snapshot");
                None
            }
        }
    }

    fn from_snapshots(&self) -> AdmitResult<(String, Frame)> {
        let required: Vec<&str> = self.required.iter().map(String::as_str).collect();
        match self.snapshots.latest(&required)? {
            Some((path, frame)) if !frame.is_empty() => {
                Ok((format!("snapshot:{}", path.display()), frame))
            }
            Some((path, _)) => Err(AdmitError::DataUnavailable(format!(
                "latest snapshot {} has no rows",
                path.display()
            ))),
            None => Err(AdmitError::DataUnavailable(format!(
                "no remote data and no usable snapshot in {}",
                self.snapshots.root().display()
            ))),
        }
    }

    /// Raw frame without side effects, plus a description of its origin.
    pub fn fetch_frame(&self) -> AdmitResult<(String, Frame)> {
        match self.from_remote() {
            Some(found) => Ok(found),
            None => self.from_snapshots(),
        }
    }

    /// Fetch and export the frame to the run's feature store.
    pub fn fetch(&self, ns: &RunNamespace) -> AdmitResult<Frame> {
        let (source, frame) = self.fetch_frame()?;
        write_csv(&ns.path(Stage::DataIngestion, FEATURE_STORE_FILE), &frame.columns, &frame.rows)?;
        let manifest = IngestManifest {
            source,
            rows: frame.len(),
            columns: frame.columns.len(),
            fingerprint: fingerprint(&frame),
            fetched_at: time::now_rfc3339(),
        };
        write_json(&ns.path(Stage::DataIngestion, MANIFEST_FILE), &manifest)?;
        tracing::info!(source = %manifest.source, rows = manifest.rows, fingerprint = %manifest.fingerprint, "dataset ingested");
        Ok(frame)
    }
}

/// Content hash over header and cells.
pub fn fingerprint(frame: &Frame) -> String {
    let mut hash = SimpleHash::new();
    hash.update(frame.columns.join(",").as_bytes());
    for row in &frame.rows {
        hash.update(b"\n");
        hash.update(row.join(",").as_bytes());
    }
    hash.finish_hex()
}

/// Disjoint train/holdout partitions stratified by label class.
///
/// Each class contributes `round(n * test_ratio)` rows to the holdout. Both
/// partitions keep ingestion order.
pub fn split(dataset: &Dataset, test_ratio: f64, seed: u64) -> (Dataset, Dataset) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for class in 0..3 {
        let mut members: Vec<usize> = (0..dataset.len())
            .filter(|&i| dataset.labels[i].class_index() == class)
            .collect();
        members.shuffle(&mut rng);
        let n_test = (members.len() as f64 * test_ratio).round() as usize;
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    (dataset.subset(&train), dataset.subset(&test))
}

/// Persist both partitions under `data_ingestion/ingested/`.
pub fn persist_split(ns: &RunNamespace, train: &Dataset, test: &Dataset) -> AdmitResult<()> {
    for (rel, part) in [(TRAIN_FILE, train), (TEST_FILE, test)] {
        let frame = part.to_frame();
        write_csv(&ns.path(Stage::DataIngestion, rel), &frame.columns, &frame.rows)?;
    }
    Ok(())
}
