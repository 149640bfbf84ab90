//! Drift report types shared by validation and the pipeline outcome.

use serde::{Deserialize, Serialize};

/// Distance of one column between reference and incoming data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnDrift {
    pub column: String,
    pub kind: ColumnClass,
    pub distance: f64,
    pub drifted: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnClass {
    Numeric,
    Categorical,
}

/// Outcome of the drift check, persisted as YAML.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub method: String,
    pub reference_rows: usize,
    pub current_rows: usize,
    pub columns: Vec<ColumnDrift>,
    /// Share of drifted columns.
    pub drift_share: f64,
    pub dataset_drifted: bool,
}

impl DriftReport {
    pub fn drifted_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| c.drifted)
            .map(|c| c.column.as_str())
    }
}
