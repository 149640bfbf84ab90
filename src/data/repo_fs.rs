//! Local snapshot store: a directory of dated CSV exports.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::NaiveDateTime;

use crate::common::error::AdmitResult;
use crate::common::time;

use super::domain::Frame;

/// Read side of the snapshot directory.
pub struct SnapshotStore {
    root: PathBuf,
}

#[derive(Debug)]
struct SnapshotFile {
    path: PathBuf,
    stamp: Option<NaiveDateTime>,
    modified: SystemTime,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// CSV files, newest first: dated names above undated ones, then mtime.
    fn candidates(&self) -> AdmitResult<Vec<SnapshotFile>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            let is_csv = path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
            if !is_csv || !path.is_file() {
                continue;
            }
            let stamp = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(time::stamp_in_name);
            let modified = fs::metadata(&path)?
                .modified()
                .unwrap_or(SystemTime::UNIX_EPOCH);
            files.push(SnapshotFile {
                path,
                stamp,
                modified,
            });
        }
        files.sort_by(|a, b| {
            (b.stamp.is_some(), b.stamp, b.modified, &b.path)
                .cmp(&(a.stamp.is_some(), a.stamp, a.modified, &a.path))
        });
        Ok(files)
    }

    /// Most recent snapshot whose header carries every `required` column.
    ///
    /// Unreadable files are skipped with a warning.
    pub fn latest(&self, required: &[&str]) -> AdmitResult<Option<(PathBuf, Frame)>> {
        for file in self.candidates()? {
            match read_csv(&file.path) {
                Ok(frame) => {
                    let missing: Vec<&str> = required
                        .iter()
                        .copied()
                        .filter(|c| !frame.has_column(c))
                        .collect();
                    if missing.is_empty() {
                        return Ok(Some((file.path, frame)));
                    }
                    tracing::debug!(path = %file.path.display(), ?missing, "snapshot skipped");
                }
                Err(err) => {
                    tracing::warn!(path = %file.path.display(), error = %err, "unreadable snapshot")
                }
            }
        }
        Ok(None)
    }
}

/// Load a CSV file with a header row into a frame.
pub fn read_csv(path: &Path) -> AdmitResult<Frame> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_path(path)?;
    let columns = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(Frame::new(columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn newest_dated_file_with_required_header_wins() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "admissions_2024-01-01.csv", "a,b\n1,2\n");
        write(dir.path(), "admissions_2025-02-01_09-00-00.csv", "a,b\n3,4\n");
        write(dir.path(), "admissions_2026-01-01.csv", "a\n5\n");
        write(dir.path(), "notes.txt", "a,b\n");
        write(dir.path(), "undated.csv", "a,b\n9,9\n");

        let store = SnapshotStore::new(dir.path());
        let (path, frame) = store.latest(&["a", "b"]).unwrap().unwrap();
        assert!(path.ends_with("admissions_2025-02-01_09-00-00.csv"));
        assert_eq!(frame.rows, vec![vec!["3".to_string(), "4".to_string()]]);
    }

    #[test]
    fn missing_directory_yields_nothing() {
        let store = SnapshotStore::new("/nonexistent/admit/snapshots");
        assert!(store.latest(&["a"]).unwrap().is_none());
    }
}
