// lib.rs - training pipeline and inference service for admission outcomes
pub mod common;
pub mod artifact;
pub mod data;
pub mod validation;
pub mod transform;
pub mod training;
pub mod evaluation;
pub mod registry;
pub mod inference;
pub mod pipeline;
pub mod api;

pub use common::{AdmitCode, AdmitError, AdmitResult};
pub use inference::{InferenceService, Prediction};
pub use pipeline::{PipelineOutcome, TrainingPipeline};
