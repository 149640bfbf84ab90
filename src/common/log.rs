//! Logging setup and the structured stage event.
//!
//! Stage events keep the `stage`/`event`/`code`/`dur_ms` field set so the JSON
//! formatter produces one flat line per event.

use tracing_subscriber::EnvFilter;

use crate::common::error::AdmitCode;

/// Install the global subscriber. Safe to call more than once.
pub fn init(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    let result = if json {
        builder.json().flatten_event(true).try_init()
    } else {
        builder.try_init()
    };
    if result.is_err() {
        tracing::debug!("subscriber already installed");
    }
}

/// Emit a stage event with the stable outcome code and its duration.
pub fn stage_event(stage: &str, event: &str, code: AdmitCode, dur_ms: u128) {
    match code {
        AdmitCode::Ok | AdmitCode::PromotionSkipped => {
            tracing::info!(stage, event, code = code.as_u32(), dur_ms = dur_ms as u64)
        }
        AdmitCode::DriftDetected | AdmitCode::TrainingFailure => {
            tracing::warn!(stage, event, code = code.as_u32(), dur_ms = dur_ms as u64)
        }
        _ => tracing::error!(stage, event, code = code.as_u32(), dur_ms = dur_ms as u64),
    }
}
