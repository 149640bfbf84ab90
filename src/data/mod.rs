//! Data domain: raw frames, typed records, the schema and the ingestion adapter.

pub mod domain;
pub mod remote;
pub mod repo_fs;
pub mod schema;
pub mod service;

pub use domain::{ApplicantRecord, Cells, Dataset, Frame, Labels, LanguageTrack};
pub use schema::{ParseMode, SchemaSpec};
pub use service::DataSourceAdapter;
