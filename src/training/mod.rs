//! Training domain: classifier families, grid search and candidate persistence.

pub mod domain;
pub mod models;
pub mod repo_fs;
pub mod search;
pub mod service;

pub use domain::{Estimator, Family, FittedModel, Target, TrainedModel, TrainingOutput};
pub use service::Trainer;
