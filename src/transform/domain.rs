//! Fitted transformer parameters.

use serde::{Deserialize, Serialize};

/// Imputation and scaling parameters of one numeric input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub name: String,
    pub median: f64,
    pub mean: f64,
    /// Population standard deviation, `1.0` when the column is constant.
    pub std: f64,
}

/// Fit-time vocabulary of one categorical input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub name: String,
    /// Sorted categories; the encoding has one extra trailing "unknown" slot.
    pub categories: Vec<String>,
    /// Most frequent value, used for missing cells.
    pub mode: String,
}

impl Vocabulary {
    pub fn width(&self) -> usize {
        self.categories.len() + 1
    }

    pub fn slot(&self, value: &str) -> usize {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .unwrap_or(self.categories.len())
    }
}

/// Immutable output of `fit`, shared by training and inference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformerState {
    pub numeric: Vec<NumericStats>,
    pub categorical: Vec<Vocabulary>,
    pub fitted_rows: usize,
}

impl TransformerState {
    /// Length of every transformed row.
    pub fn width(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(Vocabulary::width).sum::<usize>()
    }

    /// Column names of the transformed matrix.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.numeric.iter().map(|s| s.name.clone()).collect();
        for vocab in &self.categorical {
            names.extend(vocab.categories.iter().map(|c| format!("{}={c}", vocab.name)));
            names.push(format!("{}=__unknown__", vocab.name));
        }
        names
    }
}
