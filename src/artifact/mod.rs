//! Versioned, timestamped namespace holding the outputs of each stage.

pub mod domain;
pub mod repo_fs;

pub use domain::{RunNamespace, Stage};
pub use repo_fs::ArtifactStore;
