//! Schema gate followed by the advisory drift check.

use crate::artifact::repo_fs::write_yaml;
use crate::artifact::{RunNamespace, Stage};
use crate::common::config::DriftCfg;
use crate::common::error::{AdmitCode, AdmitResult};
use crate::data::{Dataset, Frame, SchemaSpec};

use super::domain::{ColumnClass, ColumnDrift, DriftReport};
use super::drift::{ColumnDistance, Psi};

pub const REPORT_FILE: &str = "drift_report/report.yaml";

/// Parse `frame` against `schema`, then measure drift against `reference`.
///
/// Schema problems abort with `SchemaViolation`; drift never does.
pub fn validate(
    frame: &Frame,
    schema: &SchemaSpec,
    reference: &Dataset,
    cfg: &DriftCfg,
) -> AdmitResult<(Dataset, DriftReport)> {
    let dataset = schema.parse_frame(frame)?;
    let distance = Psi { bins: cfg.bins };
    let report = detect_drift(reference, &dataset, schema, &distance, cfg);
    if report.dataset_drifted {
        let drifted: Vec<&str> = report.drifted_columns().collect();
        tracing::warn!(
            code = AdmitCode::DriftDetected.as_u32(),
            share = report.drift_share,
            ?drifted,
            "dataset drift detected"
        );
    }
    Ok((dataset, report))
}

/// Compare every schema feature column of `current` with `reference`.
pub fn detect_drift(
    reference: &Dataset,
    current: &Dataset,
    schema: &SchemaSpec,
    distance: &dyn ColumnDistance,
    cfg: &DriftCfg,
) -> DriftReport {
    let mut columns = Vec::new();
    for name in schema.numeric_columns() {
        let sample = |d: &Dataset| -> Vec<f64> {
            d.records.iter().filter_map(|r| r.numeric(name)).collect()
        };
        let value = distance.numeric(&sample(reference), &sample(current));
        columns.push(ColumnDrift {
            column: name.to_string(),
            kind: ColumnClass::Numeric,
            distance: value,
            drifted: value > cfg.column_threshold,
        });
    }
    for name in schema.categorical_columns() {
        let sample = |d: &Dataset| -> Vec<String> {
            d.records
                .iter()
                .filter_map(|r| r.categorical(name).map(str::to_string))
                .collect()
        };
        let (r, c) = (sample(reference), sample(current));
        let value = distance.categorical(&as_refs(&r), &as_refs(&c));
        columns.push(ColumnDrift {
            column: name.to_string(),
            kind: ColumnClass::Categorical,
            distance: value,
            drifted: value > cfg.column_threshold,
        });
    }
    let drifted = columns.iter().filter(|c| c.drifted).count();
    let drift_share = if columns.is_empty() {
        0.0
    } else {
        drifted as f64 / columns.len() as f64
    };
    DriftReport {
        method: distance.name().to_string(),
        reference_rows: reference.len(),
        current_rows: current.len(),
        columns,
        drift_share,
        dataset_drifted: drift_share > cfg.dataset_threshold,
    }
}

fn as_refs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}

pub fn persist_report(ns: &RunNamespace, report: &DriftReport) -> AdmitResult<()> {
    write_yaml(&ns.path(Stage::DataValidation, REPORT_FILE), report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ApplicantRecord, Labels, LanguageTrack};

    fn record(gpa: f64, country: &str) -> ApplicantRecord {
        ApplicantRecord {
            application_id: None,
            program_category: "undergraduate".into(),
            country: country.into(),
            bit_program_applied: "physics".into(),
            previous_gpa: gpa,
            math_physics_background_score: 5.0,
            research_alignment_score: 5.0,
            publication_count: 0.0,
            recommendation_strength: 5.0,
            interview_score: 60.0,
            language: LanguageTrack::EnglishTaught {
                english_test_type: "ielts".into(),
                english_score: 7.0,
            },
        }
    }

    fn dataset(records: Vec<ApplicantRecord>) -> Dataset {
        let labels = vec![Labels { admitted: false, scholarship: false }; records.len()];
        Dataset::new(records, labels)
    }

    #[test]
    fn same_data_is_not_drifted() {
        let d = dataset((0..40).map(|i| record(2.0 + (i % 10) as f64 / 5.0, "kenya")).collect());
        let report = detect_drift(&d, &d, &SchemaSpec::default(), &Psi::default(), &DriftCfg::default());
        assert_eq!(report.drift_share, 0.0);
        assert!(!report.dataset_drifted);
        assert_eq!(report.current_rows, 40);
    }

    #[test]
    fn shifted_columns_are_flagged() {
        let reference = dataset((0..40).map(|i| record(1.0 + (i % 10) as f64 / 10.0, "kenya")).collect());
        let current = dataset((0..40).map(|i| record(4.0 + (i % 10) as f64 / 10.0, "brazil")).collect());
        let report = detect_drift(
            &reference,
            &current,
            &SchemaSpec::default(),
            &Psi::default(),
            &DriftCfg::default(),
        );
        let drifted: Vec<&str> = report.drifted_columns().collect();
        assert_eq!(drifted, vec!["previous_gpa", "country"]);
        assert!(report.drift_share > 0.0);
        // two of thirteen columns stay below the dataset threshold
        assert!(!report.dataset_drifted);
    }
}
