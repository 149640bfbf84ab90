//! Error handling primitives shared across the pipeline and the inference service.
//!
//! Every fallible operation returns [`AdmitResult`]. The numeric [`AdmitCode`]
//! table is stable: log lines carry it in the `code` field and the HTTP layer
//! maps it to a status.

use thiserror::Error;

/// Stable outcome codes emitted in structured logs.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AdmitCode {
    /// Success code used as a sentinel.
    Ok = 0,
    /// Neither the remote store nor the local snapshots produced data.
    DataUnavailable = 1,
    /// A record broke the schema; the run is aborted.
    SchemaViolation = 2,
    /// Advisory: the incoming data drifted away from the reference.
    DriftDetected = 3,
    /// A classifier family failed to fit.
    TrainingFailure = 4,
    /// Normal outcome: the new model did not beat production.
    PromotionSkipped = 5,
    /// Inference was requested before any promotion happened.
    ModelNotLoaded = 6,
    /// Configuration could not be parsed or is inconsistent.
    Config = 7,
    /// Filesystem or network plumbing failed.
    Io = 8,
    /// An artifact could not be encoded or decoded.
    Serialization = 9,
}

impl AdmitCode {
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Canonical error type for the crate.
#[derive(Debug, Error)]
pub enum AdmitError {
    #[error("no usable dataset: {0}")]
    DataUnavailable(String),

    #[error("schema violation in column '{column}'{}: {reason}", row_suffix(.row))]
    SchemaViolation {
        column: String,
        /// Zero-based data row, `None` for header level problems.
        row: Option<usize>,
        reason: String,
    },

    #[error("training failed for {target}: {reason}")]
    TrainingFailure { target: String, reason: String },

    #[error("no promoted model is available")]
    ModelNotLoaded,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("remote source error: {0}")]
    Remote(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn row_suffix(row: &Option<usize>) -> String {
    row.map(|r| format!(" at row {r}")).unwrap_or_default()
}

/// Result alias used throughout the crate.
pub type AdmitResult<T> = Result<T, AdmitError>;

impl AdmitError {
    /// Schema helper.
    pub fn schema(column: impl Into<String>, row: Option<usize>, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            column: column.into(),
            row,
            reason: reason.into(),
        }
    }

    /// Training helper.
    pub fn training(target: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Self::TrainingFailure {
            target: target.to_string(),
            reason: reason.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn serialization(err: impl std::fmt::Display) -> Self {
        Self::Serialization(err.to_string())
    }

    /// Stable code for logs and transport mapping.
    pub fn code(&self) -> AdmitCode {
        match self {
            Self::DataUnavailable(_) => AdmitCode::DataUnavailable,
            Self::SchemaViolation { .. } => AdmitCode::SchemaViolation,
            Self::TrainingFailure { .. } => AdmitCode::TrainingFailure,
            Self::ModelNotLoaded => AdmitCode::ModelNotLoaded,
            Self::Config(_) => AdmitCode::Config,
            Self::Remote(_) | Self::Io(_) => AdmitCode::Io,
            Self::Serialization(_) => AdmitCode::Serialization,
        }
    }
}

impl From<serde_json::Error> for AdmitError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err)
    }
}

impl From<serde_yaml::Error> for AdmitError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::serialization(err)
    }
}

impl From<csv::Error> for AdmitError {
    fn from(err: csv::Error) -> Self {
        Self::serialization(err)
    }
}
