//! Validation: fail-fast schema gate and advisory drift detection.

pub mod domain;
pub mod drift;
pub mod service;

pub use domain::{ColumnDrift, DriftReport};
pub use drift::{ColumnDistance, Psi};
pub use service::validate;
