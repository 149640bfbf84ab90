//! Filesystem-backed artifact store.
//!
//! Every run gets `<root>/<run_stamp>/`; creation is exclusive so two runs
//! started in the same second never share a namespace.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::common::error::{AdmitError, AdmitResult};
use crate::common::ids::RunId;
use crate::common::time;

use super::domain::{RunNamespace, Stage};

/// Artifact namespace factory rooted at `root`.
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Allocate the namespace of a new run, keyed by its start timestamp.
    pub fn begin_run(&self) -> AdmitResult<RunNamespace> {
        self.begin_run_named(&time::run_stamp())
    }

    /// Allocate a namespace for `stamp`, suffixing `_1`, `_2`, ... when taken.
    pub fn begin_run_named(&self, stamp: &str) -> AdmitResult<RunNamespace> {
        fs::create_dir_all(&self.root)?;
        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                stamp.to_string()
            } else {
                format!("{stamp}_{attempt}")
            };
            let dir = self.root.join(&name);
            match fs::create_dir(&dir) {
                Ok(()) => {
                    for stage in Stage::ALL {
                        fs::create_dir_all(dir.join(stage.dir_name()))?;
                    }
                    tracing::debug!(run = %name, "run namespace allocated");
                    return Ok(RunNamespace {
                        run_id: RunId::new(name),
                        dir,
                    });
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn ensure_parent(path: &Path) -> AdmitResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Pretty JSON artifact.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> AdmitResult<()> {
    ensure_parent(path)?;
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> AdmitResult<T> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(io::BufReader::new(file))?)
}

pub fn write_yaml<T: Serialize + ?Sized>(path: &Path, value: &T) -> AdmitResult<()> {
    ensure_parent(path)?;
    let file = File::create(path)?;
    serde_yaml::to_writer(BufWriter::new(file), value)?;
    Ok(())
}

/// CSV with a header row.
pub fn write_csv(path: &Path, header: &[String], rows: &[Vec<String>]) -> AdmitResult<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Numeric matrix as CSV, the label columns appended after the features.
pub fn write_matrix(
    path: &Path,
    feature_names: &[String],
    features: &Array2<f64>,
    labels: &[(&str, Vec<bool>)],
) -> AdmitResult<()> {
    if labels.iter().any(|(_, col)| col.len() != features.nrows()) {
        return Err(AdmitError::serialization("label column length differs from matrix"));
    }
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    let mut header: Vec<String> = feature_names.to_vec();
    header.extend(labels.iter().map(|(name, _)| name.to_string()));
    writer.write_record(&header)?;
    for (i, row) in features.rows().into_iter().enumerate() {
        let mut record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        record.extend(labels.iter().map(|(_, col)| u8::from(col[i]).to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Replace `path` atomically: write a sibling temp file, then rename it over the target.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> AdmitResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| AdmitError::config(format!("{} has no parent", path.display())))?;
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| AdmitError::Io(e.error))?;
    Ok(())
}
