//! Inference domain: production snapshot handling and single-record prediction.

pub mod domain;
pub mod service;

pub use domain::{Prediction, PredictionReport, ProductionSnapshot};
pub use service::InferenceService;
