//! Evaluation: holdout metrics and deterministic ranking of candidates.

pub mod domain;
pub mod metrics;
pub mod service;

pub use domain::{EvaluationResult, Ranking};
pub use service::{evaluate, select_best};
