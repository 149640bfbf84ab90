//! Runtime configuration loaded from the environment and an optional YAML file.
//!
//! Environment variables select paths and the remote source; the pipeline
//! knobs (drift thresholds, promotion delta, hyper-parameter grids) live in
//! [`PipelineCfg`], which has working defaults and can be overridden by the
//! YAML file named in `ADMIT_PIPELINE_CONFIG`.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::common::error::{AdmitError, AdmitResult};
use crate::training::domain::Family;

/// Connection settings for the remote document store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteCfg {
    pub url: String,
    pub database: String,
    pub collection: String,
}

/// Snapshot of configuration values consumed by the pipeline and the server.
#[derive(Clone, Debug)]
pub struct AppCfg {
    pub artifact_root: PathBuf,
    pub snapshot_dir: PathBuf,
    pub remote: Option<RemoteCfg>,
    pub schema_path: Option<PathBuf>,
    pub pipeline: PipelineCfg,
    pub log_json: bool,
    pub bind_addr: String,
}

impl AppCfg {
    /// Create a configuration snapshot from the process environment.
    pub fn load() -> AdmitResult<Self> {
        fn env_or(key: &str, default: &str) -> String {
            env::var(key).unwrap_or_else(|_| default.to_string())
        }
        fn env_opt(key: &str) -> Option<String> {
            env::var(key).ok().filter(|v| !v.trim().is_empty())
        }

        let remote = remote_from_parts(
            env_opt("MONGODB_URL_KEY"),
            env_opt("DATABASE_NAME"),
            env_opt("COLLECTION_NAME"),
        );

        let pipeline = match env_opt("ADMIT_PIPELINE_CONFIG") {
            Some(path) => PipelineCfg::from_yaml_file(Path::new(&path))?,
            None => PipelineCfg::default(),
        };
        pipeline.validate()?;

        Ok(Self {
            artifact_root: PathBuf::from(env_or("ADMIT_ARTIFACT_ROOT", "./bit_artifact")),
            snapshot_dir: PathBuf::from(env_or("ADMIT_SNAPSHOT_DIR", "./original_dataset")),
            remote,
            schema_path: env_opt("ADMIT_SCHEMA").map(PathBuf::from),
            pipeline,
            log_json: env_or("ADMIT_LOG_FORMAT", "pretty").eq_ignore_ascii_case("json"),
            bind_addr: env_or("ADMIT_BIND", "0.0.0.0:8080"),
        })
    }

    /// Configuration rooted at explicit directories, no remote source.
    pub fn local(artifact_root: impl Into<PathBuf>, snapshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_root: artifact_root.into(),
            snapshot_dir: snapshot_dir.into(),
            remote: None,
            schema_path: None,
            pipeline: PipelineCfg::default(),
            log_json: false,
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }

    /// Directory holding the production bundle.
    pub fn best_model_dir(&self) -> PathBuf {
        self.artifact_root.join("best_model")
    }
}

/// The remote source is only enabled when every part is present.
pub fn remote_from_parts(
    url: Option<String>,
    database: Option<String>,
    collection: Option<String>,
) -> Option<RemoteCfg> {
    match (url, database, collection) {
        (Some(url), Some(database), Some(collection)) => Some(RemoteCfg {
            url,
            database,
            collection,
        }),
        _ => None,
    }
}

/// Drift gate settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DriftCfg {
    /// Number of quantile bins for numeric columns.
    pub bins: usize,
    /// Per-column distance above which a column counts as drifted.
    pub column_threshold: f64,
    /// Share of drifted columns above which the dataset counts as drifted.
    pub dataset_threshold: f64,
}

impl Default for DriftCfg {
    fn default() -> Self {
        Self {
            bins: 10,
            column_threshold: 0.2,
            dataset_threshold: 0.5,
        }
    }
}

/// Hyper-parameter grid for one classifier family.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FamilyGrid {
    pub family: Family,
    #[serde(default)]
    pub grid: BTreeMap<String, Vec<f64>>,
}

/// Knobs for one training run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineCfg {
    pub test_ratio: f64,
    pub seed: u64,
    pub cv_folds: usize,
    pub connect_timeout_ms: u64,
    pub drift: DriftCfg,
    pub promotion_min_delta: f64,
    pub reference_snapshot: Option<PathBuf>,
    pub families: Vec<FamilyGrid>,
}

impl Default for PipelineCfg {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            seed: 42,
            cv_folds: 3,
            connect_timeout_ms: 3_000,
            drift: DriftCfg::default(),
            promotion_min_delta: 0.07,
            reference_snapshot: None,
            families: default_families(),
        }
    }
}

fn grid(entries: &[(&str, &[f64])]) -> BTreeMap<String, Vec<f64>> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_vec()))
        .collect()
}

/// Default grid per family. Ranking ties fall back to the `Family` declaration
/// order, not to the order of this list.
pub fn default_families() -> Vec<FamilyGrid> {
    vec![
        FamilyGrid {
            family: Family::LogisticRegression,
            grid: grid(&[
                ("learning_rate", &[0.1, 0.5]),
                ("l2", &[0.0, 0.01]),
                ("epochs", &[300.0]),
            ]),
        },
        FamilyGrid {
            family: Family::GaussianNaiveBayes,
            grid: grid(&[("var_smoothing", &[1e-9, 1e-3])]),
        },
        FamilyGrid {
            family: Family::DecisionTree,
            grid: grid(&[("max_depth", &[3.0, 5.0]), ("min_samples_split", &[2.0, 6.0])]),
        },
    ]
}

impl PipelineCfg {
    pub fn from_yaml_file(path: &Path) -> AdmitResult<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            AdmitError::config(format!("cannot read pipeline config {}: {e}", path.display()))
        })?;
        let cfg: Self = serde_yaml::from_str(&raw)
            .map_err(|e| AdmitError::config(format!("invalid pipeline config: {e}")))?;
        Ok(cfg)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn validate(&self) -> AdmitResult<()> {
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(AdmitError::config("test_ratio must lie strictly between 0 and 1"));
        }
        if self.cv_folds < 2 {
            return Err(AdmitError::config("cv_folds must be at least 2"));
        }
        if self.drift.bins < 2 {
            return Err(AdmitError::config("drift.bins must be at least 2"));
        }
        if self.promotion_min_delta < 0.0 {
            return Err(AdmitError::config("promotion_min_delta must not be negative"));
        }
        if self.families.is_empty() {
            return Err(AdmitError::config("at least one classifier family is required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_requires_every_part() {
        assert!(remote_from_parts(Some("http://db".into()), Some("db".into()), None).is_none());
        let cfg = remote_from_parts(
            Some("http://db".into()),
            Some("admissions".into()),
            Some("applicants".into()),
        )
        .unwrap();
        assert_eq!(cfg.collection, "applicants");
    }

    #[test]
    fn yaml_overrides_merge_with_defaults() {
        let cfg: PipelineCfg = serde_yaml::from_str(
            "cv_folds: 5\ndrift:\n  column_threshold: 0.3\nfamilies:\n  - family: decision_tree\n    grid:\n      max_depth: [2]\n",
        )
        .unwrap();
        assert_eq!(cfg.cv_folds, 5);
        assert_eq!(cfg.seed, 42);
        assert_eq!(cfg.drift.bins, 10);
        assert_eq!(cfg.drift.column_threshold, 0.3);
        assert_eq!(cfg.families.len(), 1);
        assert_eq!(cfg.families[0].family, Family::DecisionTree);
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_inconsistent_values() {
        let cfg = PipelineCfg {
            cv_folds: 1,
            ..PipelineCfg::default()
        };
        assert!(matches!(cfg.validate(), Err(AdmitError::Config(_))));
    }
}
