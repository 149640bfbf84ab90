//! Stage names and the per-run namespace.

use std::path::{Path, PathBuf};

use crate::common::ids::RunId;

/// Pipeline stages owning a directory inside a run namespace.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Stage {
    DataIngestion,
    DataValidation,
    DataTransformation,
    ModelTrainer,
    ModelEvaluation,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::DataIngestion,
        Stage::DataValidation,
        Stage::DataTransformation,
        Stage::ModelTrainer,
        Stage::ModelEvaluation,
    ];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Stage::DataIngestion => "data_ingestion",
            Stage::DataValidation => "data_validation",
            Stage::DataTransformation => "data_transformation",
            Stage::ModelTrainer => "model_trainer",
            Stage::ModelEvaluation => "model_evaluation",
        }
    }
}

/// Directory exclusively owned by one pipeline run.
#[derive(Clone, Debug)]
pub struct RunNamespace {
    pub run_id: RunId,
    pub dir: PathBuf,
}

impl RunNamespace {
    pub fn stage_dir(&self, stage: Stage) -> PathBuf {
        self.dir.join(stage.dir_name())
    }

    /// Path of a file below a stage directory, `rel` may contain subdirectories.
    pub fn path(&self, stage: Stage, rel: impl AsRef<Path>) -> PathBuf {
        self.stage_dir(stage).join(rel)
    }
}
