//! Feature transformation: engineered inputs, imputation, scaling and one-hot encoding.

pub mod domain;
pub mod features;
pub mod service;

pub use domain::TransformerState;
pub use service::{apply, apply_batch, fit};
