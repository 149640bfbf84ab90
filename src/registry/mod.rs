//! Model registry: the production bundle and the promotion gate.

pub mod domain;
pub mod repo_fs;
pub mod service;

pub use domain::{ProductionBundle, PromotionDecision, PromotionOutcome, PromotionRepo};
pub use repo_fs::FsPromotionRepo;
pub use service::promote;
