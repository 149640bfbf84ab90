//! Time helpers shared by the pipeline stages.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Local, NaiveDate, NaiveDateTime, Utc};

/// Layout used for run namespaces and dated snapshot files.
pub const RUN_STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Current timestamp in milliseconds since the Unix epoch.
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// Local wall-clock stamp naming a run namespace.
pub fn run_stamp() -> String {
    Local::now().format(RUN_STAMP_FORMAT).to_string()
}

/// RFC 3339 UTC timestamp for records.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Find the latest date stamp embedded in a file stem, if any.
///
/// Both `2025-01-31_08-15-00` and bare `2025-01-31` are recognised.
pub fn stamp_in_name(stem: &str) -> Option<NaiveDateTime> {
    let bytes = stem.as_bytes();
    let mut best: Option<NaiveDateTime> = None;
    for start in 0..bytes.len() {
        if !bytes[start].is_ascii_digit() {
            continue;
        }
        let full = stem
            .get(start..start + 19)
            .and_then(|s| NaiveDateTime::parse_from_str(s, RUN_STAMP_FORMAT).ok());
        let found = full.or_else(|| {
            stem.get(start..start + 10)
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        });
        if let Some(ts) = found {
            best = Some(best.map_or(ts, |b| b.max(ts)));
        }
    }
    best
}
